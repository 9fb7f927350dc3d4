//! Contracts of the remote services the orchestrator drives.
//!
//! | Service            | Request                                  | Success                        |
//! |--------------------|------------------------------------------|--------------------------------|
//! | analyze            | code, filename, model, timeout           | edit set (possibly empty)      |
//! | apply              | code, edits                              | new code                       |
//! | crosscheck         | code, model, timeout                     | [`CrossCheckReport`]           |
//! | fix_from_crosscheck| code, report, model, timeout             | optional code, optional edits  |
//! | vision_analyze     | code, prompt, image, model, timeout      | edits, optional code           |
//! | run                | code                                     | exit code, stdout, stderr      |
//!
//! Every response carries an `ok` flag that is checked before anything else.

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::capture::ImageInput;
use crate::edit::{CrossCheckReport, EditSet};
use crate::errors::ServiceError;

pub use http::HttpServices;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyzeRequest {
    pub code: String,
    pub filename: String,
    pub model: String,
    pub timeout: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossCheckRequest {
    pub code: String,
    pub model: String,
    pub timeout: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixRequest {
    pub code: String,
    pub crosscheck: CrossCheckReport,
    pub model: String,
    pub timeout: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisionRequest {
    pub code: String,
    pub prompt: String,
    pub image: Option<ImageInput>,
    pub model: String,
    pub timeout: u64,
}

/// Outcome of a fix-from-cross-check call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixResult {
    pub code: Option<String>,
    pub edits: Option<EditSet>,
}

/// Outcome of a vision comparison.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisionResult {
    pub code: Option<String>,
    pub edits: EditSet,
}

/// Result of executing the code in the sandbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutput {
    pub exit_code: i64,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
}

/// The remote collaborators of a workflow run.
/// Real implementation: [`HttpServices`]. Tests substitute a recording double.
#[async_trait]
pub trait RemoteServices: Send + Sync {
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<EditSet, ServiceError>;

    async fn apply_edits(&self, code: &str, edits: &EditSet) -> Result<String, ServiceError>;

    async fn cross_check(
        &self,
        request: &CrossCheckRequest,
    ) -> Result<CrossCheckReport, ServiceError>;

    async fn fix_from_cross_check(&self, request: &FixRequest) -> Result<FixResult, ServiceError>;

    async fn vision_analyze(&self, request: &VisionRequest) -> Result<VisionResult, ServiceError>;

    async fn run(&self, code: &str) -> Result<RunOutput, ServiceError>;
}
