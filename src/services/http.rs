//! JSON-over-HTTP client for the remote services.
//!
//! Each service is a single `POST {base_url}/api/<name>` exchange. The backend
//! answers failures with a non-2xx status and an `{ "ok": false, "error": ... }`
//! body, so the body is always read and the `ok` flag decides, not the status.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::{
    AnalyzeRequest, CrossCheckRequest, FixRequest, FixResult, RemoteServices, RunOutput,
    VisionRequest, VisionResult,
};
use crate::capture::ImageInput;
use crate::edit::{CrossCheckReport, Edit, EditSet};
use crate::errors::ServiceError;

const ERROR_SNIPPET_CHARS: usize = 200;

#[derive(Serialize)]
struct ApplyBody<'a> {
    code: &'a str,
    edits: &'a [Edit],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VisionBody<'a> {
    code: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<&'a str>,
    model: &'a str,
    timeout: u64,
}

#[derive(Serialize)]
struct RunBody<'a> {
    code: &'a str,
}

/// Client for a fixloop-compatible backend.
pub struct HttpServices {
    client: reqwest::Client,
    base_url: String,
}

impl HttpServices {
    /// `connect_timeout` bounds connection setup only; request timeouts are
    /// forwarded to the backend in each request body.
    pub fn new(base_url: &str, connect_timeout: Duration) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(concat!("fixloop/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| ServiceError::Transport {
                service: "client",
                source,
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        service: &'static str,
        path: &str,
        body: &B,
    ) -> Result<Value, ServiceError> {
        let url = format!("{}/api/{}", self.base_url, path);
        debug!(service, %url, "sending request");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| ServiceError::Transport { service, source })?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|source| ServiceError::Transport { service, source })?;
        debug!(service, %status, bytes = text.len(), "received response");

        let value: Value = serde_json::from_str(&text).map_err(|_| {
            warn!(service, %status, "response body is not JSON");
            ServiceError::Decode {
                service,
                message: format!("HTTP {}: {}", status, snippet(&text)),
            }
        })?;
        check_envelope(service, value)
    }
}

fn snippet(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() > ERROR_SNIPPET_CHARS {
        let head: String = trimmed.chars().take(ERROR_SNIPPET_CHARS).collect();
        format!("{}...", head)
    } else {
        trimmed.to_string()
    }
}

/// Consult the `ok` flag before anything else in the response.
pub(crate) fn check_envelope(service: &'static str, value: Value) -> Result<Value, ServiceError> {
    match value.get("ok").and_then(Value::as_bool) {
        Some(true) => Ok(value),
        Some(false) => Err(ServiceError::Rejected {
            service,
            message: value
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("request failed")
                .to_string(),
        }),
        None => Err(ServiceError::Decode {
            service,
            message: "response has no 'ok' flag".to_string(),
        }),
    }
}

fn optional_code(value: &Value) -> Option<String> {
    value.get("code").and_then(Value::as_str).map(str::to_string)
}

pub(crate) fn decode_apply(value: &Value) -> Result<String, ServiceError> {
    optional_code(value).ok_or_else(|| ServiceError::Decode {
        service: "apply",
        message: "response has no 'code'".to_string(),
    })
}

pub(crate) fn decode_fix(value: &Value) -> FixResult {
    FixResult {
        code: optional_code(value),
        edits: value
            .get("edits")
            .filter(|v| !v.is_null())
            .map(EditSet::from_response),
    }
}

pub(crate) fn decode_vision(value: &Value) -> VisionResult {
    VisionResult {
        code: optional_code(value),
        edits: value
            .get("edits")
            .map(EditSet::from_response)
            .unwrap_or_default(),
    }
}

pub(crate) fn decode_run(value: &Value) -> Result<RunOutput, ServiceError> {
    serde_json::from_value(value.clone()).map_err(|e| ServiceError::Decode {
        service: "run",
        message: e.to_string(),
    })
}

#[async_trait]
impl RemoteServices for HttpServices {
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<EditSet, ServiceError> {
        let value = self.post("analyze", "analyze", request).await?;
        Ok(value
            .get("result")
            .map(EditSet::from_response)
            .unwrap_or_default())
    }

    async fn apply_edits(&self, code: &str, edits: &EditSet) -> Result<String, ServiceError> {
        let body = ApplyBody {
            code,
            edits: &edits.edits,
        };
        let value = self.post("apply", "apply", &body).await?;
        decode_apply(&value)
    }

    async fn cross_check(
        &self,
        request: &CrossCheckRequest,
    ) -> Result<CrossCheckReport, ServiceError> {
        let value = self.post("crosscheck", "crosscheck", request).await?;
        Ok(CrossCheckReport::sanitize(&value))
    }

    async fn fix_from_cross_check(&self, request: &FixRequest) -> Result<FixResult, ServiceError> {
        let value = self
            .post("fix_from_crosscheck", "fix_from_crosscheck", request)
            .await?;
        Ok(decode_fix(&value))
    }

    async fn vision_analyze(&self, request: &VisionRequest) -> Result<VisionResult, ServiceError> {
        let (image_base64, image_url) = match &request.image {
            Some(ImageInput::Inline(image)) => (Some(image.to_base64()), None),
            Some(ImageInput::Url(url)) => (None, Some(url.as_str())),
            None => (None, None),
        };
        let body = VisionBody {
            code: &request.code,
            prompt: &request.prompt,
            image_base64,
            image_url,
            model: &request.model,
            timeout: request.timeout,
        };
        let value = self.post("vision_analyze", "vision_analyze", &body).await?;
        Ok(decode_vision(&value))
    }

    async fn run(&self, code: &str) -> Result<RunOutput, ServiceError> {
        let value = self.post("run", "run", &RunBody { code }).await?;
        decode_run(&value)
    }
}
