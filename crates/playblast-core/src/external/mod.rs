//! Boundaries to programs the ledger does not own: the host renderer, the
//! movie encoder, the mail relay and image viewers.

pub mod notify;
pub mod process;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{RenderSettings, TranscodeSettings};
use crate::error::{PlayblastError, Result};
use process::{run_command, CommandSpec};

/// Host-side frame number placeholder embedded in artifact templates.
pub const FRAME_PLACEHOLDER: &str = "$F3";

/// The encoder's spelling of the same placeholder.
pub const ENCODER_FRAME_PATTERN: &str = "%03d";

/// Inclusive frame range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRange {
    pub start: i64,
    pub end: i64,
}

impl FrameRange {
    pub fn new(start: i64, end: i64) -> Result<Self> {
        if end < start {
            return Err(PlayblastError::Config(format!(
                "frame range end {end} is before start {start}"
            )));
        }
        Ok(Self { start, end })
    }
}

/// What the renderer is asked to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    /// Output path containing [`FRAME_PLACEHOLDER`].
    pub artifact_template: String,
    pub frames: FrameRange,
}

/// Produces numbered frames at a templated path.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, request: &RenderRequest) -> Result<()>;

    /// Save the host document under an incremented name. Hosts without the
    /// notion treat this as a no-op.
    async fn save_document(&self) -> Result<()> {
        Ok(())
    }
}

/// Builds a movie from a rendered frame sequence.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// `frames` is the artifact template with the host placeholder intact.
    async fn transcode(&self, frames: &str, movie: &Path) -> Result<()>;
}

/// Renderer that runs a configured command line.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    settings: RenderSettings,
    document: PathBuf,
    timeout_secs: u64,
}

impl CommandRenderer {
    pub fn new(settings: RenderSettings, document: impl Into<PathBuf>, timeout_secs: u64) -> Self {
        Self {
            settings,
            document: document.into(),
            timeout_secs,
        }
    }

    pub fn command_for(&self, request: &RenderRequest) -> CommandSpec {
        let args = self.settings.args.iter().map(|arg| {
            self.expand(arg)
                .replace("{output}", &request.artifact_template)
                .replace("{start}", &request.frames.start.to_string())
                .replace("{end}", &request.frames.end.to_string())
        });
        CommandSpec::new(&self.settings.program)
            .args(args)
            .timeout_secs(self.timeout_secs)
    }

    /// Command for `[render.save]`, if one is configured.
    pub fn save_command(&self) -> Option<CommandSpec> {
        let save = self.settings.save.as_ref()?;
        Some(
            CommandSpec::new(&save.program)
                .args(save.args.iter().map(|arg| self.expand(arg)))
                .timeout_secs(self.timeout_secs),
        )
    }

    fn expand(&self, arg: &str) -> String {
        arg.replace("{document}", &self.document.to_string_lossy())
    }
}

#[async_trait]
impl Renderer for CommandRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<()> {
        run_command(&self.command_for(request)).await.map(|_| ())
    }

    async fn save_document(&self) -> Result<()> {
        let spec = self.save_command().ok_or_else(|| {
            PlayblastError::Config("no [render.save] command configured".to_string())
        })?;
        run_command(&spec).await.map(|_| ())
    }
}

/// Renderer for hosts that write the frames themselves once they are handed
/// the slot. Rendering is a no-op here.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostRenderer;

#[async_trait]
impl Renderer for HostRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<()> {
        tracing::debug!(artifact = %request.artifact_template, "render left to host");
        Ok(())
    }
}

/// `ffmpeg -y -r <fps> -i <frames> <movie>`, run inside the frame directory.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    settings: TranscodeSettings,
}

impl FfmpegTranscoder {
    pub fn new(settings: TranscodeSettings) -> Self {
        Self { settings }
    }

    pub fn command_for(&self, frames: &str, movie: &Path) -> CommandSpec {
        let input = PathBuf::from(frames.replace(FRAME_PLACEHOLDER, ENCODER_FRAME_PATTERN));
        let dir = input.parent().map(Path::to_path_buf).unwrap_or_default();
        let file_name = |p: &Path| {
            p.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        };

        CommandSpec::new(&self.settings.program)
            .args([
                "-y".to_string(),
                "-r".to_string(),
                self.settings.fps.to_string(),
                "-i".to_string(),
                file_name(&input),
                file_name(movie),
            ])
            .current_dir(dir)
            .timeout_secs(self.settings.timeout_secs)
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, frames: &str, movie: &Path) -> Result<()> {
        run_command(&self.command_for(frames, movie))
            .await
            .map(|_| ())
    }
}

/// Movie path for a frame template: `<frame dir>/<document up to first '.'>.mp4`.
pub fn movie_path(artifact_template: &str, scene_name: &str) -> PathBuf {
    let dir = Path::new(artifact_template)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let stem = scene_name.split('.').next().unwrap_or(scene_name);
    dir.join(format!("{stem}.mp4"))
}
