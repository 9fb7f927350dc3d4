//! Typed error hierarchy for fixloop.
//!
//! Four enums cover the four failure families:
//! - `EditError`: operator-supplied structured text that fails validation
//! - `ServiceError`: remote call failures (transport or `ok=false`)
//! - `CaptureError`: screen capture denied or unavailable
//! - `WorkflowError`: local problems that stop a workflow run before its first call

use thiserror::Error;

/// Local validation errors for edit sets. Raised before any remote call.
#[derive(Debug, Error)]
pub enum EditError {
    #[error("Edit set is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Edit set must be a JSON object, got {found}")]
    NotAnObject { found: &'static str },

    #[error("Edit set has no 'edits' field")]
    MissingEdits,

    #[error("'edits' must be an array, got {found}")]
    EditsNotArray { found: &'static str },
}

/// Errors from calls to the remote services.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} failed: {message}")]
    Rejected {
        service: &'static str,
        message: String,
    },

    #[error("{service} returned an unreadable response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },
}

/// Capability failures of the capture adapter. Never retried.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Screen capture was cancelled or denied")]
    Denied,

    #[error("Screen capture is unavailable: {0}")]
    Unavailable(String),

    #[error("Screen capture I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that stop a workflow run from starting or continuing.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Another workflow run is in progress")]
    RunInProgress,

    #[error("No cross-check report is available; run a cross-check first")]
    NoReport,

    #[error("Invalid edit set: {0}")]
    InvalidEdits(#[from] EditError),
}
