pub mod engine;
pub mod run;
pub mod source;

pub use engine::{NO_CHANGES_MESSAGE, Orchestrator, WorkflowSettings};
pub use run::{RunSlot, RunState, RunSummary, Step, StepOutcome, Verification, WorkflowRun};
pub use source::SourceText;
