//! Immutable configuration shared by the preview and publish managers.
//!
//! Typically loaded from a TOML file and then adjusted by CLI flags:
//!
//! ```toml
//! document = "/shows/demo/sh010/fx/smoke_v012.hip"
//! classification = "fx"
//! user = "alice"
//! version_mode = "create_new"
//! build_movie = true
//!
//! [render]
//! program = "hbatch"
//! args = ["-c", "viewwrite -f {start} {end} '{output}'"]
//!
//! [render.save]
//! program = "hbatch"
//! args = ["-c", "mwrite -i '{document}'"]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PlayblastError, Result};
use crate::ledger::DELIMITER;
use crate::viewer::Viewer;

/// Whether a preview run gets a fresh version slot or re-renders the latest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionMode {
    #[default]
    CreateNew,
    ReuseLatest,
}

/// External render command. `{output}`, `{start}`, `{end}` and `{document}`
/// are substituted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSettings {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Saves the host document under an incremented name after a run.
    #[serde(default)]
    pub save: Option<SaveSettings>,
}

/// Host save command. `{document}` is substituted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveSettings {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// External encoder settings for building a movie from the frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeSettings {
    pub program: String,
    pub fps: u32,
    pub timeout_secs: u64,
}

impl Default for TranscodeSettings {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            fps: 24,
            timeout_secs: 600,
        }
    }
}

/// Mail relay used for completion notices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub from: String,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 25,
            from: "playblast@localhost".to_string(),
        }
    }
}

fn default_process_timeout() -> u64 {
    3600
}

/// Everything a manager needs, fixed for the lifetime of the manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayblastConfig {
    /// The host document being previewed; its directory is the default base.
    pub document: PathBuf,
    #[serde(default)]
    pub preview_base: Option<PathBuf>,
    #[serde(default)]
    pub publish_base: Option<PathBuf>,
    pub classification: String,
    #[serde(default = "current_user")]
    pub user: String,
    #[serde(default)]
    pub version_mode: VersionMode,
    #[serde(default)]
    pub build_movie: bool,
    #[serde(default)]
    pub notify: bool,
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default)]
    pub incremental_save: bool,
    #[serde(default)]
    pub render: Option<RenderSettings>,
    #[serde(default)]
    pub transcode: TranscodeSettings,
    #[serde(default)]
    pub smtp: SmtpSettings,
    #[serde(default)]
    pub viewer: Viewer,
    /// Upper bound on the render step; `0` waits indefinitely.
    #[serde(default = "default_process_timeout")]
    pub process_timeout_secs: u64,
}

/// Login name of the current user, or `"unknown"`.
pub fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

impl PlayblastConfig {
    /// Minimal config for `document`; everything else defaulted.
    pub fn new(document: impl Into<PathBuf>, classification: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            preview_base: None,
            publish_base: None,
            classification: classification.into(),
            user: current_user(),
            version_mode: VersionMode::default(),
            build_movie: false,
            notify: false,
            recipient: None,
            incremental_save: false,
            render: None,
            transcode: TranscodeSettings::default(),
            smtp: SmtpSettings::default(),
            viewer: Viewer::default(),
            process_timeout_secs: default_process_timeout(),
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| PlayblastError::Config(format!("parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PlayblastError::fs(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Check the identity fields that end up in paths and ledger lines.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("classification", &self.classification), ("user", &self.user)] {
            if value.trim().is_empty() {
                return Err(PlayblastError::Config(format!("{name} must not be empty")));
            }
            if value.contains(DELIMITER) || value.contains(&['/', '\\', '\n', '\r'][..]) {
                return Err(PlayblastError::Config(format!(
                    "{name} contains a delimiter or path separator: {value:?}"
                )));
            }
        }
        if self.notify && self.recipient.is_none() {
            return Err(PlayblastError::Config(
                "notify is set but no recipient is configured".to_string(),
            ));
        }
        if self.notify && self.smtp.host.trim().is_empty() {
            return Err(PlayblastError::Config(
                "notify is set but smtp.host is empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Document file name without its final extension (`smoke_v012`).
    pub fn document_stem(&self) -> String {
        self.document
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "untitled".to_string())
    }

    /// Document file name for display (`smoke_v012.hip`).
    pub fn scene_name(&self) -> String {
        self.document
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "untitled".to_string())
    }
}
