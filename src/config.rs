//! Configuration for fixloop.
//!
//! Settings are read from `.fixloop/fixloop.toml` in the project directory,
//! falling back to `fixloop/fixloop.toml` under the user config directory.
//! Layering is file → environment → CLI.
//!
//! # Configuration File Format
//!
//! ```toml
//! [service]
//! base_url = "http://127.0.0.1:5174"
//! connect_timeout_secs = 10
//!
//! [defaults]
//! model = "gemini-2.5-pro"
//! timeout_secs = 60
//! filename = "snippet.py"
//!
//! [capture]
//! tool = "gnome-screenshot"
//! ```
//!
//! Environment: `FIXLOOP_SERVER` overrides `service.base_url`; `FAST_MODEL`
//! is used when no model is configured.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::orchestrator::WorkflowSettings;

pub const CONFIG_DIR: &str = ".fixloop";
pub const CONFIG_FILE: &str = "fixloop.toml";
pub const DEFAULT_SERVER: &str = "http://127.0.0.1:5174";
pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_FILENAME: &str = "snippet.py";

/// Remote backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSection {
    /// Base URL of the backend (default: http://127.0.0.1:5174)
    #[serde(default)]
    pub base_url: Option<String>,
    /// Connection setup timeout; request timeouts are forwarded, not enforced
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            base_url: None,
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// Defaults forwarded with every model-backed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsSection {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Filename reported to the analyzer when the source has no path
    #[serde(default)]
    pub filename: Option<String>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for DefaultsSection {
    fn default() -> Self {
        Self {
            model: None,
            timeout_secs: default_timeout_secs(),
            filename: None,
        }
    }
}

/// Screen capture settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptureSection {
    /// Screenshot program; detected from the platform when unset
    #[serde(default)]
    pub tool: Option<String>,
}

/// The complete fixloop.toml structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixloopToml {
    #[serde(default)]
    pub service: ServiceSection,
    #[serde(default)]
    pub defaults: DefaultsSection,
    #[serde(default)]
    pub capture: CaptureSection,
}

impl FixloopToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse fixloop.toml")
    }

    /// Load `fixloop.toml` from `config_dir`, or defaults if it doesn't exist.
    pub fn load_or_default(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize fixloop.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Backend URL; the environment overrides the file.
    pub fn base_url(&self) -> String {
        std::env::var("FIXLOOP_SERVER")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.service.base_url.clone())
            .unwrap_or_else(|| DEFAULT_SERVER.to_string())
    }

    /// Model name, with fallback to `FAST_MODEL`.
    pub fn model(&self) -> String {
        self.defaults
            .model
            .clone()
            .or_else(|| std::env::var("FAST_MODEL").ok().filter(|v| !v.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Some(url) = &self.service.base_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            warnings.push(format!(
                "Invalid base_url '{}': must start with http:// or https://",
                url
            ));
        }
        if self.defaults.timeout_secs == 0 {
            warnings.push("timeout_secs = 0 will be raised to 1 second".to_string());
        }
        if self.service.connect_timeout_secs == 0 {
            warnings.push("connect_timeout_secs = 0 disables connecting entirely".to_string());
        }
        if let Some(model) = &self.defaults.model
            && model.trim().is_empty()
        {
            warnings.push("model is empty; the backend default will not be used".to_string());
        }

        warnings
    }
}

/// Requests never carry a timeout below one second.
pub fn clamp_timeout(secs: u64) -> u64 {
    secs.max(1)
}

/// Return the config directory for a project.
pub fn config_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(CONFIG_DIR)
}

/// Unified configuration: fixloop.toml plus runtime overrides.
#[derive(Debug, Clone)]
pub struct FixloopConfig {
    pub project_dir: PathBuf,
    pub config_dir: PathBuf,
    pub toml: FixloopToml,
    pub cli_server: Option<String>,
    pub cli_model: Option<String>,
    pub cli_timeout: Option<u64>,
    pub verbose: bool,
    pub dry_run: bool,
}

impl FixloopConfig {
    /// Load configuration for a project directory.
    ///
    /// The project file wins; the per-user file is used only when the
    /// project has none.
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let config_dir = config_dir(&project_dir);
        let toml = if config_dir.join(CONFIG_FILE).exists() {
            FixloopToml::load_or_default(&config_dir)?
        } else {
            match user_config_dir() {
                Some(dir) => FixloopToml::load_or_default(&dir)?,
                None => FixloopToml::default(),
            }
        };

        Ok(Self {
            project_dir,
            config_dir,
            toml,
            cli_server: None,
            cli_model: None,
            cli_timeout: None,
            verbose: false,
            dry_run: false,
        })
    }

    /// Backend URL (CLI → env → file → default).
    pub fn base_url(&self) -> String {
        self.cli_server
            .clone()
            .unwrap_or_else(|| self.toml.base_url())
    }

    /// Model (CLI → file → env → default).
    pub fn model(&self) -> String {
        self.cli_model.clone().unwrap_or_else(|| self.toml.model())
    }

    /// Timeout forwarded to the backend (CLI → file → default), at least 1s.
    pub fn timeout_secs(&self) -> u64 {
        clamp_timeout(self.cli_timeout.unwrap_or(self.toml.defaults.timeout_secs))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.toml.service.connect_timeout_secs)
    }

    /// Filename reported to the analyzer for `source`.
    pub fn filename_for(&self, source: Option<&Path>) -> String {
        source
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .or_else(|| self.toml.defaults.filename.clone())
            .unwrap_or_else(|| DEFAULT_FILENAME.to_string())
    }

    pub fn workflow_settings(&self, source: Option<&Path>) -> WorkflowSettings {
        WorkflowSettings {
            model: self.model(),
            timeout_secs: self.timeout_secs(),
            filename: self.filename_for(source),
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    pub fn session_file(&self) -> PathBuf {
        self.config_dir.join(crate::session::SESSION_FILE)
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}

fn user_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("fixloop"))
}
