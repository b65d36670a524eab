//! Structured events for the preview and publish lifecycles.
//!
//! Every event carries an `event` field (`preview.allocated`,
//! `publish.completed`, ...) so log pipelines can filter on it.

use std::path::Path;

use tracing::{info, warn};

/// Span guard tagging everything logged during one version transaction.
pub struct VersionSpan {
    _span: tracing::span::EnteredSpan,
}

impl VersionSpan {
    pub fn enter(operation: &'static str, root: &Path) -> Self {
        let span = tracing::info_span!("playblast", op = operation, root = %root.display());
        Self {
            _span: span.entered(),
        }
    }
}

pub fn emit_preview_allocated(tag: &str, directory: &Path, reused: bool) {
    info!(
        event = "preview.allocated",
        tag = %tag,
        directory = %directory.display(),
        reused = reused,
    );
}

pub fn emit_ledger_appended(ledger: &Path, tag: &str) {
    info!(event = "ledger.appended", ledger = %ledger.display(), tag = %tag);
}

pub fn emit_render_finished(tag: &str, success: bool) {
    info!(event = "render.finished", tag = %tag, success = success);
}

/// An auxiliary step (transcode, save, notify) failed; the version stands.
pub fn emit_auxiliary_failure(step: &str, error: &dyn std::fmt::Display) {
    warn!(event = "auxiliary.failed", step = %step, error = %error);
}

pub fn emit_copy_skipped(file: &Path, error: &dyn std::fmt::Display) {
    warn!(event = "publish.copy_skipped", file = %file.display(), error = %error);
}

pub fn emit_publish_completed(publish_tag: &str, source_tag: &str, files: usize, skipped: usize) {
    info!(
        event = "publish.completed",
        publish_tag = %publish_tag,
        source_tag = %source_tag,
        files = files,
        skipped = skipped,
    );
}

pub fn emit_batch_finished(total: usize, failed: usize) {
    info!(event = "publish.batch_finished", total = total, failed = failed);
}
