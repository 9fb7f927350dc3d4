//! Session storage: a best-effort mirror of the editing session.
//!
//! The file `.fixloop/session.json` holds the current source under the fixed
//! key [`CODE_KEY`] and the last cross-check report with its rendered surface,
//! together with the code that report was produced for.
//! Reads fall back to an empty session and writes only log on failure, so
//! storage trouble never interrupts editing.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::edit::CrossCheckReport;
use crate::presenter::ReportSurface;

pub const CODE_KEY: &str = "fixloop.code";
pub const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default)]
    pub entries: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<CrossCheckReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surface: Option<ReportSurface>,
    /// The source text the saved report checked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SessionData {
    /// Take the saved report and surface if they were produced for `code`.
    /// A report saved for any other text is dropped.
    pub fn take_report_for(
        &mut self,
        code: &str,
    ) -> (Option<CrossCheckReport>, Option<ReportSurface>) {
        let report = self.report.take();
        let surface = self.surface.take();
        if self.checked_code.as_deref() == Some(code) {
            (report, surface)
        } else {
            (None, None)
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store inside a project's `.fixloop` directory.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(SESSION_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the session. Missing or unreadable files yield an empty session.
    pub fn load(&self) -> SessionData {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable session file");
                SessionData::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => SessionData::default(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read session file");
                SessionData::default()
            }
        }
    }

    pub fn code(&self) -> Option<String> {
        self.load().entries.get(CODE_KEY).cloned()
    }

    /// Mirror the current source. Returns whether the write succeeded.
    pub fn save_code(&self, code: &str) -> bool {
        self.update(|data| {
            data.entries.insert(CODE_KEY.to_string(), code.to_string());
        })
    }

    /// Retain the last report, its rendered surface and the code it checked.
    /// Best-effort.
    pub fn save_report(
        &self,
        report: &CrossCheckReport,
        surface: &ReportSurface,
        checked_code: &str,
    ) -> bool {
        self.update(|data| {
            data.report = Some(report.clone());
            data.surface = Some(surface.clone());
            data.checked_code = Some(checked_code.to_string());
        })
    }

    /// Remove the session file.
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to remove session file: {}", self.path.display())),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut SessionData)) -> bool {
        let mut data = self.load();
        apply(&mut data);
        data.updated_at = Some(Utc::now());
        match self.write(&data) {
            Ok(()) => {
                debug!(path = %self.path.display(), "session saved");
                true
            }
            Err(e) => {
                warn!(error = %format!("{:#}", e), "session storage failed; continuing");
                false
            }
        }
    }

    fn write(&self, data: &SessionData) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(data).context("Failed to serialize session")?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write session file: {}", self.path.display()))
    }
}
