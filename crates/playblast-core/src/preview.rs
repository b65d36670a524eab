//! Creating preview versions.
//!
//! One call walks `resolve -> allocate -> append ledger -> issue artifact
//! path`, then hands the path to the renderer. A failed step aborts the rest
//! with no rollback: a version directory without a ledger line is a harmless
//! orphan that later scans number past.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::config::{PlayblastConfig, VersionMode};
use crate::error::{PlayblastError, PreviewStage, Result};
use crate::external::notify::{validate_recipient, Notification, Notifier, SmtpNotifier};
use crate::external::{
    movie_path, CommandRenderer, FfmpegTranscoder, FrameRange, RenderRequest, Renderer,
    Transcoder, FRAME_PLACEHOLDER,
};
use crate::ledger::{ledger_timestamp, sanitize_field, LedgerStore, PreviewRecord};
use crate::obs::{
    emit_auxiliary_failure, emit_ledger_appended, emit_preview_allocated, emit_render_finished,
    VersionSpan,
};
use crate::paths::PathResolver;
use crate::version::{create_version_dir, latest_version, list_versions, next_version};
use crate::version::{VersionKind, VersionTag};

/// Who is previewing what, and whether to take a fresh slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewRequest {
    pub classification: String,
    pub user: String,
    pub note: String,
    pub mode: VersionMode,
}

impl PreviewRequest {
    pub fn from_config(config: &PlayblastConfig, note: impl Into<String>) -> Self {
        Self {
            classification: config.classification.clone(),
            user: config.user.clone(),
            note: note.into(),
            mode: config.version_mode,
        }
    }

    pub fn with_mode(mut self, mode: VersionMode) -> Self {
        self.mode = mode;
        self
    }
}

/// The version a render should write into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewSlot {
    pub tag: String,
    pub number: u32,
    pub directory: PathBuf,
    /// Output path with [`FRAME_PLACEHOLDER`] for the renderer to expand.
    pub artifact_template: String,
    /// `false` when an existing version was reused.
    pub created: bool,
}

/// An auxiliary step that failed without undoing the version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuxiliaryWarning {
    pub step: &'static str,
    pub message: String,
}

/// Outcome of a full playblast run.
#[derive(Debug, Clone, Serialize)]
pub struct PlayblastReport {
    pub slot: PreviewSlot,
    pub movie: Option<PathBuf>,
    pub notified: bool,
    pub warnings: Vec<AuxiliaryWarning>,
}

pub struct PreviewManager {
    config: PlayblastConfig,
    resolver: PathResolver,
    renderer: Arc<dyn Renderer>,
    transcoder: Arc<dyn Transcoder>,
    notifier: Arc<dyn Notifier>,
}

impl PreviewManager {
    pub fn new(config: PlayblastConfig, renderer: Arc<dyn Renderer>) -> Result<Self> {
        config.validate()?;
        let transcoder = Arc::new(FfmpegTranscoder::new(config.transcode.clone()));
        let notifier = Arc::new(SmtpNotifier::new(config.smtp.clone()));
        Ok(Self {
            resolver: PathResolver::new(&config)?,
            config,
            renderer,
            transcoder,
            notifier,
        })
    }

    /// Manager rendering through the command configured under `[render]`.
    ///
    /// `incremental_save` additionally requires `[render.save]`.
    pub fn from_config(config: PlayblastConfig) -> Result<Self> {
        let settings = config.render.clone().ok_or_else(|| {
            PlayblastError::Config("no [render] command configured".to_string())
        })?;
        if config.incremental_save && settings.save.is_none() {
            return Err(PlayblastError::Config(
                "incremental_save is set but no [render.save] command is configured".to_string(),
            ));
        }
        let renderer = Arc::new(CommandRenderer::new(
            settings,
            config.document.clone(),
            config.process_timeout_secs,
        ));
        Self::new(config, renderer)
    }

    pub fn with_transcoder(mut self, transcoder: Arc<dyn Transcoder>) -> Self {
        self.transcoder = transcoder;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn config(&self) -> &PlayblastConfig {
        &self.config
    }

    pub fn preview_root(&self, classification: &str, user: &str) -> PathBuf {
        self.resolver.preview_root(classification, user)
    }

    /// Allocate (or reuse) a version and return where the render should go.
    ///
    /// A missing preview root is the only trigger for the first-version fast
    /// path; otherwise `request.mode` decides between a new slot and the
    /// latest existing one. Reuse appends nothing to the ledger.
    pub fn create_preview(&self, request: &PreviewRequest) -> Result<PreviewSlot> {
        let root = self
            .resolver
            .preview_root(&request.classification, &request.user);
        let _span = VersionSpan::enter("preview", &root);
        let ledger = LedgerStore::in_root(&root);

        if !root.exists() {
            fs::create_dir_all(&root)
                .map_err(|e| PlayblastError::fs(&root, e))
                .map_err(PlayblastError::at(PreviewStage::ResolveDirectory))?;
            let tag = VersionTag::first(VersionKind::Preview);
            let dir = create_version_dir(&root, tag)
                .map_err(PlayblastError::at(PreviewStage::AllocateSlot))?;
            return self.commit_new(&ledger, request, tag, dir);
        }

        match request.mode {
            VersionMode::CreateNew => {
                let tag = next_version(&root, VersionKind::Preview)
                    .map_err(PlayblastError::at(PreviewStage::AllocateSlot))?;
                let dir = create_version_dir(&root, tag)
                    .map_err(PlayblastError::at(PreviewStage::AllocateSlot))?;
                self.commit_new(&ledger, request, tag, dir)
            }
            VersionMode::ReuseLatest => {
                let tag = latest_version(&root, VersionKind::Preview)
                    .and_then(|t| t.ok_or_else(|| PlayblastError::NoVersions(root.clone())))
                    .map_err(PlayblastError::at(PreviewStage::AllocateSlot))?;
                let record = ledger
                    .find_preview(tag.number())
                    .and_then(|r| r.ok_or(PlayblastError::VersionNotFound(tag.number())))
                    .map_err(PlayblastError::at(PreviewStage::AllocateSlot))?;
                let directory = root.join(tag.to_string());
                emit_preview_allocated(&tag.to_string(), &directory, true);
                Ok(PreviewSlot {
                    tag: tag.to_string(),
                    number: tag.number(),
                    directory,
                    artifact_template: record.artifact_path,
                    created: false,
                })
            }
        }
    }

    fn commit_new(
        &self,
        ledger: &LedgerStore,
        request: &PreviewRequest,
        tag: VersionTag,
        directory: PathBuf,
    ) -> Result<PreviewSlot> {
        emit_preview_allocated(&tag.to_string(), &directory, false);

        let file_name = format!(
            "{}_{}.{}.png",
            self.config.document_stem(),
            tag,
            FRAME_PLACEHOLDER
        );
        let artifact_template = directory.join(file_name).to_string_lossy().into_owned();

        let record = PreviewRecord {
            version_tag: tag.to_string(),
            version_number: tag.number(),
            note: sanitize_field(&request.note),
            user: request.user.clone(),
            artifact_path: artifact_template.clone(),
            classification: request.classification.clone(),
        };
        ledger
            .append(&record)
            .map_err(PlayblastError::at(PreviewStage::AppendLedger))?;
        emit_ledger_appended(ledger.path(), &record.version_tag);

        Ok(PreviewSlot {
            tag: tag.to_string(),
            number: tag.number(),
            directory,
            artifact_template,
            created: true,
        })
    }

    /// Allocate, render, then run the auxiliary steps the config asks for.
    ///
    /// Only allocation and the render itself can fail the call. Transcode,
    /// document save and notification failures are returned as warnings.
    pub async fn playblast(
        &self,
        request: &PreviewRequest,
        frames: FrameRange,
    ) -> Result<PlayblastReport> {
        let slot = self.create_preview(request)?;

        let render = RenderRequest {
            artifact_template: slot.artifact_template.clone(),
            frames,
        };
        let rendered = self.renderer.render(&render).await;
        emit_render_finished(&slot.tag, rendered.is_ok());
        rendered.map_err(PlayblastError::at(PreviewStage::Render))?;

        let mut warnings = Vec::new();
        let mut movie = None;

        if self.config.build_movie {
            let path = movie_path(&slot.artifact_template, &self.config.scene_name());
            match self.transcoder.transcode(&slot.artifact_template, &path).await {
                Ok(()) => movie = Some(path),
                Err(e) => warnings.push(auxiliary("transcode", &e)),
            }
        }

        if self.config.incremental_save {
            if let Err(e) = self.renderer.save_document().await {
                warnings.push(auxiliary("save_document", &e));
            }
        }

        let mut notified = false;
        if self.config.notify {
            match self.notify(&slot.artifact_template).await {
                Ok(()) => notified = true,
                Err(e) => warnings.push(auxiliary("notify", &e)),
            }
        }

        Ok(PlayblastReport {
            slot,
            movie,
            notified,
            warnings,
        })
    }

    async fn notify(&self, artifact_path: &str) -> Result<()> {
        let recipient = self.config.recipient.as_deref().unwrap_or_default();
        validate_recipient(recipient)?;

        let notification = Notification::playblast_done(
            recipient,
            &self.config.user,
            &self.config.scene_name(),
            &ledger_timestamp(),
            artifact_path,
        );
        let notifier = Arc::clone(&self.notifier);
        tokio::task::spawn_blocking(move || notifier.send(&notification))
            .await
            .map_err(|e| PlayblastError::Notification(format!("notifier task failed: {e}")))?
    }

    /// Records for versions that still have a directory, one per version.
    pub fn history(&self, classification: &str, user: &str) -> Result<Vec<PreviewRecord>> {
        let root = self.resolver.preview_root(classification, user);
        let tags = list_versions(&root, VersionKind::Preview)?;
        let scan = LedgerStore::in_root(&root).read_all::<PreviewRecord>()?;

        Ok(tags
            .iter()
            .filter_map(|tag| {
                scan.records
                    .iter()
                    .find(|r| r.version_number == tag.number())
                    .cloned()
            })
            .collect())
    }

    /// Artifact template recorded for preview `number`.
    ///
    /// A ledger line whose version directory is gone counts as absent.
    pub fn artifact_path(&self, classification: &str, user: &str, number: u32) -> Result<String> {
        let root = self.resolver.preview_root(classification, user);
        let record = LedgerStore::in_root(&root)
            .find_preview(number)?
            .ok_or(PlayblastError::VersionNotFound(number))?;
        if !root.join(&record.version_tag).is_dir() {
            return Err(PlayblastError::VersionNotFound(number));
        }
        Ok(record.artifact_path)
    }
}

fn auxiliary(step: &'static str, error: &PlayblastError) -> AuxiliaryWarning {
    emit_auxiliary_failure(step, error);
    AuxiliaryWarning {
        step,
        message: error.to_string(),
    }
}
