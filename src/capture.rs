//! Still-image capture of a display or window, for vision comparison.
//!
//! A capture asks the operator to pick what to grab, takes exactly one frame
//! through the platform screenshot tool, and returns the encoded image. The
//! tool process is awaited before returning and is killed if the capture
//! future is dropped; the temporary file goes away with its directory.
//!
//! Captured images are plain values. Nothing here remembers the last capture:
//! callers hand the image straight to the workflow run that needs it.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::errors::CaptureError;

const JPEG_SIGNATURE: &[u8] = &[0xFF, 0xD8, 0xFF];

/// What the operator wants captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureTarget {
    /// A single window, picked interactively by the tool.
    Window,
    /// The whole display.
    Display,
}

impl std::fmt::Display for CaptureTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureTarget::Window => write!(f, "window"),
            CaptureTarget::Display => write!(f, "display"),
        }
    }
}

/// An encoded still image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

impl CapturedImage {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            mime_type: sniff_mime(&bytes),
            bytes,
            captured_at: Utc::now(),
        }
    }

    /// Load an image that was captured earlier or by another tool.
    pub async fn from_path(path: &Path) -> Result<Self, CaptureError> {
        let bytes = tokio::fs::read(path).await?;
        if bytes.is_empty() {
            return Err(CaptureError::Unavailable(format!(
                "{} is empty",
                path.display()
            )));
        }
        Ok(Self::from_bytes(bytes))
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(JPEG_SIGNATURE) {
        "image/jpeg"
    } else {
        // PNG, or unknown: the vision backend assumes PNG for inline payloads.
        "image/png"
    }
}

/// Image reference passed to the vision service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageInput {
    Inline(CapturedImage),
    Url(String),
}

/// Abstraction over screen capture so workflows can be tested without a display.
#[async_trait]
pub trait ScreenCapture: Send + Sync {
    async fn capture(&self, target: CaptureTarget) -> Result<CapturedImage, CaptureError>;
}

/// Screenshot programs the command-line capture knows how to drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureTool {
    /// macOS `screencapture`
    ScreenCapture,
    /// ImageMagick `import` (X11)
    Import,
    /// `gnome-screenshot`
    GnomeScreenshot,
    /// Any program that takes the output path as its last argument.
    Custom(String),
}

impl CaptureTool {
    /// Pick the first supported tool available on this host.
    pub fn detect() -> Option<Self> {
        let candidates = if cfg!(target_os = "macos") {
            vec![CaptureTool::ScreenCapture]
        } else {
            vec![CaptureTool::GnomeScreenshot, CaptureTool::Import]
        };
        candidates
            .into_iter()
            .find(|tool| which::which(tool.program()).is_ok())
    }

    /// Resolve a configured tool name, falling back to detection.
    pub fn from_config(name: Option<&str>) -> Option<Self> {
        match name {
            Some("screencapture") => Some(CaptureTool::ScreenCapture),
            Some("import") => Some(CaptureTool::Import),
            Some("gnome-screenshot") => Some(CaptureTool::GnomeScreenshot),
            Some(other) if !other.trim().is_empty() => Some(CaptureTool::Custom(other.to_string())),
            _ => Self::detect(),
        }
    }

    pub fn program(&self) -> &str {
        match self {
            CaptureTool::ScreenCapture => "screencapture",
            CaptureTool::Import => "import",
            CaptureTool::GnomeScreenshot => "gnome-screenshot",
            CaptureTool::Custom(program) => program.as_str(),
        }
    }

    /// Arguments for a single-frame capture of `target` written to `out`.
    pub fn args(&self, target: CaptureTarget, out: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = match (self, target) {
            // -x: no shutter sound; -i -w: operator clicks the window
            (CaptureTool::ScreenCapture, CaptureTarget::Window) => {
                vec!["-x".into(), "-i".into(), "-w".into()]
            }
            (CaptureTool::ScreenCapture, CaptureTarget::Display) => vec!["-x".into()],
            // Without -window, import waits for the operator to click a window.
            (CaptureTool::Import, CaptureTarget::Window) => Vec::new(),
            (CaptureTool::Import, CaptureTarget::Display) => {
                vec!["-window".into(), "root".into()]
            }
            (CaptureTool::GnomeScreenshot, CaptureTarget::Window) => {
                vec!["-w".into(), "-f".into()]
            }
            (CaptureTool::GnomeScreenshot, CaptureTarget::Display) => vec!["-f".into()],
            (CaptureTool::Custom(_), _) => Vec::new(),
        };
        args.push(out.as_os_str().to_os_string());
        args
    }
}

/// Captures by running an external screenshot program once per frame.
pub struct CommandCapture {
    tool: Option<CaptureTool>,
}

impl CommandCapture {
    pub fn new(tool: Option<CaptureTool>) -> Self {
        Self { tool }
    }
}

#[async_trait]
impl ScreenCapture for CommandCapture {
    async fn capture(&self, target: CaptureTarget) -> Result<CapturedImage, CaptureError> {
        let tool = self.tool.as_ref().ok_or_else(|| {
            CaptureError::Unavailable("no screenshot tool found on this platform".to_string())
        })?;

        let dir = tempfile::tempdir()?;
        let out = dir.path().join("capture.png");
        let args = tool.args(target, &out);
        debug!(tool = tool.program(), %target, "starting capture");

        let status = Command::new(tool.program())
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    CaptureError::Unavailable(format!("{} is not installed", tool.program()))
                }
                _ => CaptureError::Io(e),
            })?;

        if !status.success() {
            debug!(?status, "capture tool exited without an image");
            return Err(CaptureError::Denied);
        }

        let bytes = match tokio::fs::read(&out).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(CaptureError::Denied),
            Err(e) => return Err(CaptureError::Io(e)),
        };
        if bytes.is_empty() {
            return Err(CaptureError::Denied);
        }

        debug!(bytes = bytes.len(), "capture complete");
        Ok(CapturedImage::from_bytes(bytes))
    }
}
