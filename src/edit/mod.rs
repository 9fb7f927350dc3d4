//! Data contracts exchanged with the remote services.
//!
//! - [`EditSet`] / [`Edit`]: proposed code changes, forwarded but never interpreted
//! - [`CrossCheckReport`]: verification of the current source against hidden tests

pub mod report;
pub mod set;

pub use report::{Counts, CrossCheckReport, Overall, TestOutcome, TestStatus};
pub use set::{Edit, EditSet};

/// Short name of a JSON value's kind, for error messages.
pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
