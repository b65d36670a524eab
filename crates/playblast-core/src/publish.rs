//! Promoting preview versions into the publish tree.
//!
//! A publish copies the frames of one preview version into a fresh `v###`
//! directory and appends a publish-ledger line that points back at the
//! source. Copy failures of individual files are collected, not fatal.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::config::PlayblastConfig;
use crate::error::{PlayblastError, PublishStage, Result};
use crate::ledger::{ledger_timestamp, LedgerStore, PreviewRecord, PublishRecord};
use crate::obs::{emit_batch_finished, emit_copy_skipped, emit_publish_completed, VersionSpan};
use crate::paths::PathResolver;
use crate::version::{create_version_dir, latest_version, list_versions, next_version};
use crate::version::{VersionKind, VersionTag};

/// A file that did not make it into the publish directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyWarning {
    pub file: PathBuf,
    pub message: String,
}

/// Result of one publish.
#[derive(Debug, Clone, Serialize)]
pub struct PublishOutcome {
    pub publish_tag: String,
    pub directory: PathBuf,
    pub record: PublishRecord,
    pub copied: usize,
    /// Non-empty means the publish is partial.
    pub warnings: Vec<CopyWarning>,
}

impl PublishOutcome {
    pub fn is_partial(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Per-version outcome inside a batch.
#[derive(Debug)]
pub struct BatchItem {
    pub version: u32,
    pub result: Result<PublishOutcome>,
}

/// Outcomes of [`PublishManager::publish_many`], in execution order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &PublishOutcome> {
        self.items.iter().filter_map(|i| i.result.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = (u32, &PlayblastError)> {
        self.items
            .iter()
            .filter_map(|i| i.result.as_ref().err().map(|e| (i.version, e)))
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed().next().is_none()
    }
}

/// Publishes previews of one (classification, user) tree.
#[derive(Debug, Clone)]
pub struct PublishManager {
    config: PlayblastConfig,
    resolver: PathResolver,
}

impl PublishManager {
    pub fn new(config: PlayblastConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            resolver: PathResolver::new(&config)?,
            config,
        })
    }

    fn preview_root(&self) -> PathBuf {
        self.resolver
            .preview_root(&self.config.classification, &self.config.user)
    }

    pub fn publish_root(&self) -> Result<PathBuf> {
        self.resolver.publish_root()
    }

    /// Look up a preview record whose version directory still exists.
    fn source_record(&self, number: u32) -> Result<PreviewRecord> {
        let root = self.preview_root();
        let record = LedgerStore::in_root(&root)
            .find_preview(number)?
            .ok_or(PlayblastError::VersionNotFound(number))?;
        if !root.join(&record.version_tag).is_dir() {
            return Err(PlayblastError::VersionNotFound(number));
        }
        Ok(record)
    }

    /// Publish preview `version_number` into the next `v###` slot.
    pub fn publish(&self, version_number: u32) -> Result<PublishOutcome> {
        let source = self.source_record(version_number)?;
        let source_dir = Path::new(&source.artifact_path)
            .parent()
            .map(Path::to_path_buf)
            .ok_or(PlayblastError::VersionNotFound(version_number))?;

        let root = self.publish_root()?;
        let _span = VersionSpan::enter("publish", &root);

        let (tag, destination) =
            allocate_slot(&root).map_err(PlayblastError::at_publish(PublishStage::AllocateSlot))?;
        let (copied, warnings) = copy_files(&source_dir, &destination)
            .map_err(PlayblastError::at_publish(PublishStage::CopyArtifacts))?;

        let file_name = Path::new(&source.artifact_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let record = PublishRecord {
            publish_tag: tag.to_string(),
            source_artifact_path: source.artifact_path.clone(),
            source_version_number: source.version_number,
            source_note: source.note.clone(),
            source_version_tag: source.version_tag.clone(),
            publish_artifact_path: destination.join(file_name).to_string_lossy().into_owned(),
            publish_user: self.config.user.clone(),
            publish_timestamp: ledger_timestamp(),
            classification: source.classification.clone(),
        };
        LedgerStore::in_root(&root)
            .append(&record)
            .map_err(PlayblastError::at_publish(PublishStage::AppendLedger))?;

        emit_publish_completed(&record.publish_tag, &source.version_tag, copied, warnings.len());
        Ok(PublishOutcome {
            publish_tag: record.publish_tag.clone(),
            directory: destination,
            record,
            copied,
            warnings,
        })
    }

    /// Republish the most recent preview.
    ///
    /// The latest publish is looked up only to log continuity; the source is
    /// always the newest preview version.
    pub fn publish_latest(&self) -> Result<PublishOutcome> {
        let previous = latest_version(&self.publish_root()?, VersionKind::Publish)?;
        let preview_root = self.preview_root();
        let latest = latest_version(&preview_root, VersionKind::Preview)?
            .ok_or(PlayblastError::NoVersions(preview_root))?;
        info!(
            previous_publish = %previous.map(|t| t.to_string()).unwrap_or_else(|| "none".to_string()),
            source = %latest,
            "publishing latest preview"
        );
        self.publish(latest.number())
    }

    /// Publish each version in ascending order, continuing past failures.
    ///
    /// Duplicates are kept: `[2, 2]` produces two publishes of `p002`.
    pub fn publish_many(&self, versions: &[u32]) -> BatchReport {
        let mut ordered = versions.to_vec();
        ordered.sort_unstable();

        let items: Vec<BatchItem> = ordered
            .into_iter()
            .map(|version| BatchItem {
                version,
                result: self.publish(version),
            })
            .collect();

        let report = BatchReport { items };
        emit_batch_finished(report.items.len(), report.failed().count());
        report
    }

    /// Recorded artifact path of publish `v<number>`.
    pub fn resolve_published_artifact_path(&self, publish_number: u32) -> Result<PathBuf> {
        LedgerStore::in_root(self.publish_root()?)
            .find_publish(publish_number)?
            .map(|r| PathBuf::from(r.publish_artifact_path))
            .ok_or(PlayblastError::PublishNotFound(publish_number))
    }

    /// Publish records whose directory exists, in version order.
    pub fn history(&self) -> Result<Vec<PublishRecord>> {
        let root = self.publish_root()?;
        let tags = list_versions(&root, VersionKind::Publish)?;
        let scan = LedgerStore::in_root(&root).read_all::<PublishRecord>()?;
        Ok(tags
            .iter()
            .filter_map(|tag| {
                scan.records
                    .iter()
                    .find(|r| r.publish_number() == Some(tag.number()))
                    .cloned()
            })
            .collect())
    }
}

/// Create the publish root if needed and claim the next `v###` directory.
fn allocate_slot(root: &Path) -> Result<(VersionTag, PathBuf)> {
    fs::create_dir_all(root).map_err(|e| PlayblastError::fs(root, e))?;
    let tag = next_version(root, VersionKind::Publish)?;
    let destination = create_version_dir(root, tag)?;
    Ok((tag, destination))
}

/// Copy the regular files of `from` into `to`, in name order.
///
/// Failing to list `from` is fatal; failing to copy one file is a warning.
fn copy_files(from: &Path, to: &Path) -> Result<(usize, Vec<CopyWarning>)> {
    let mut files = Vec::new();
    for entry in fs::read_dir(from).map_err(|e| PlayblastError::fs(from, e))? {
        let entry = entry.map_err(|e| PlayblastError::fs(from, e))?;
        if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            files.push(entry.path());
        }
    }
    files.sort();

    let mut copied = 0;
    let mut warnings = Vec::new();
    for src in files {
        let Some(name) = src.file_name() else {
            continue;
        };
        let dst = to.join(name);
        match fs::copy(&src, &dst) {
            Ok(_) => copied += 1,
            Err(source) => {
                let err = PlayblastError::CopyFailed {
                    from: src.clone(),
                    to: dst,
                    source,
                };
                emit_copy_skipped(&src, &err);
                warnings.push(CopyWarning {
                    file: src,
                    message: err.to_string(),
                });
            }
        }
    }
    Ok((copied, warnings))
}
