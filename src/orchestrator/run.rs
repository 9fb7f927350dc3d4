//! Bookkeeping for a single workflow run: steps, state history, outcomes,
//! and the single-flight guard.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;
use uuid::Uuid;

use crate::capture::ImageInput;
use crate::edit::Overall;
use crate::errors::WorkflowError;
use crate::status::{StatusLease, StatusSignal};

/// One remote exchange of a workflow, or the action that started it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Analyze,
    ApplyEdits,
    CrossCheck,
    FixFromCrossCheck,
    VisionAnalyze,
    VisionSubmit,
    Run,
}

impl Step {
    /// Text shown in the status signal while the step is in flight.
    pub fn status_message(self) -> &'static str {
        match self {
            Step::Analyze => "Analyzing code...",
            Step::ApplyEdits => "Applying edits...",
            Step::CrossCheck => "Cross-checking...",
            Step::FixFromCrossCheck => "Fixing from cross-check...",
            Step::VisionAnalyze => "Comparing against screenshot...",
            Step::VisionSubmit => "Submitting...",
            Step::Run => "Running code...",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Analyze => "analyze",
            Step::ApplyEdits => "apply",
            Step::CrossCheck => "cross-check",
            Step::FixFromCrossCheck => "fix",
            Step::VisionAnalyze => "vision analyze",
            Step::VisionSubmit => "submit",
            Step::Run => "run",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Requesting(Step),
    Rendering,
    Failed,
}

/// How a step ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Completed(Step),
    /// The step failed and the run halted.
    Failed { step: Step, message: String },
    /// The step failed but the run carried on or ended normally.
    Tolerated { step: Step, message: String },
}

impl StepOutcome {
    pub fn step(&self) -> Step {
        match self {
            StepOutcome::Completed(step)
            | StepOutcome::Failed { step, .. }
            | StepOutcome::Tolerated { step, .. } => *step,
        }
    }
}

/// Whether the run ended with the code cross-checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verification {
    #[default]
    NotRun,
    Verified(Overall),
    Failed,
}

/// Single-slot guard: at most one workflow run at a time. A second run is
/// rejected, never queued.
#[derive(Debug, Clone, Default)]
pub struct RunSlot {
    busy: Arc<AtomicBool>,
}

impl RunSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Result<RunGuard, WorkflowError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| WorkflowError::RunInProgress)?;
        Ok(RunGuard {
            busy: Arc::clone(&self.busy),
        })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the slot on drop.
#[derive(Debug)]
pub struct RunGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// What a finished run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub id: Uuid,
    pub action: Step,
    pub started_at: DateTime<Utc>,
    pub history: Vec<RunState>,
    pub outcomes: Vec<StepOutcome>,
    pub verification: Verification,
    /// Whether the source text was replaced during the run.
    pub mutated: bool,
}

impl RunSummary {
    /// True when a step failed and halted the run.
    pub fn failed(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| matches!(o, StepOutcome::Failed { .. }))
    }

    /// Steps in the order they were requested.
    pub fn steps(&self) -> Vec<Step> {
        self.outcomes.iter().map(StepOutcome::step).collect()
    }

    pub fn succeeded(&self) -> bool {
        !self.failed() && self.verification != Verification::Failed
    }
}

/// A live run. Holds the slot guard and the status lease; both are released
/// when the run is finished or dropped.
pub struct WorkflowRun {
    id: Uuid,
    action: Step,
    started_at: DateTime<Utc>,
    initial: String,
    image: Option<ImageInput>,
    history: Vec<RunState>,
    outcomes: Vec<StepOutcome>,
    verification: Verification,
    mutated: bool,
    lease: StatusLease,
    _guard: RunGuard,
}

impl WorkflowRun {
    /// Claim the slot for a run of `action` over `initial` source text.
    pub fn begin(
        action: Step,
        initial: String,
        slot: &RunSlot,
        status: &StatusSignal,
    ) -> Result<Self, WorkflowError> {
        let guard = slot.try_acquire()?;
        Ok(Self {
            id: Uuid::new_v4(),
            action,
            started_at: Utc::now(),
            initial,
            image: None,
            history: vec![RunState::Idle],
            outcomes: Vec::new(),
            verification: Verification::NotRun,
            mutated: false,
            lease: status.lease(),
            _guard: guard,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn action(&self) -> Step {
        self.action
    }

    pub fn mutated(&self) -> bool {
        self.mutated
    }

    /// The source text as it was when the run started.
    pub fn initial(&self) -> &str {
        &self.initial
    }

    /// Hand the run the image its vision step will send.
    pub fn attach_image(&mut self, image: Option<ImageInput>) {
        self.image = image;
    }

    pub fn image(&self) -> Option<&ImageInput> {
        self.image.as_ref()
    }

    /// Move to `Requesting(step)` and show its status message.
    pub fn enter(&mut self, step: Step) {
        debug!(run = %self.id, %step, "requesting");
        self.history.push(RunState::Requesting(step));
        self.lease.show(step.status_message());
    }

    /// Overwrite the status message without changing state.
    pub fn show_status(&self, message: impl Into<String>) {
        self.lease.show(message);
    }

    pub fn rendering(&mut self) {
        self.history.push(RunState::Rendering);
    }

    pub fn completed(&mut self, step: Step) {
        self.outcomes.push(StepOutcome::Completed(step));
    }

    pub fn failed(&mut self, step: Step, message: impl Into<String>) {
        self.history.push(RunState::Failed);
        self.outcomes.push(StepOutcome::Failed {
            step,
            message: message.into(),
        });
    }

    pub fn tolerated(&mut self, step: Step, message: impl Into<String>) {
        self.outcomes.push(StepOutcome::Tolerated {
            step,
            message: message.into(),
        });
    }

    pub fn mark_mutated(&mut self) {
        self.mutated = true;
    }

    pub fn set_verification(&mut self, verification: Verification) {
        self.verification = verification;
    }

    /// Return to `Idle` and release the slot and status signal.
    pub fn finish(mut self) -> RunSummary {
        self.history.push(RunState::Idle);
        RunSummary {
            id: self.id,
            action: self.action,
            started_at: self.started_at,
            history: std::mem::take(&mut self.history),
            outcomes: std::mem::take(&mut self.outcomes),
            verification: self.verification,
            mutated: self.mutated,
        }
    }
}
