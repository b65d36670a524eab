//! Error taxonomy for preview and publish operations.

use std::fmt;
use std::path::PathBuf;

/// Step of a preview transaction, used to attribute failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewStage {
    ResolveDirectory,
    AllocateSlot,
    AppendLedger,
    Render,
}

impl fmt::Display for PreviewStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PreviewStage::ResolveDirectory => "resolve preview directory",
            PreviewStage::AllocateSlot => "allocate version slot",
            PreviewStage::AppendLedger => "append ledger record",
            PreviewStage::Render => "render",
        };
        f.write_str(name)
    }
}

/// Step of a publish, used to attribute failures after the source is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStage {
    AllocateSlot,
    CopyArtifacts,
    AppendLedger,
}

impl fmt::Display for PublishStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PublishStage::AllocateSlot => "allocate publish slot",
            PublishStage::CopyArtifacts => "copy artifacts",
            PublishStage::AppendLedger => "append publish record",
        };
        f.write_str(name)
    }
}

/// Errors produced by the playblast ledger and its managers.
#[derive(Debug, thiserror::Error)]
pub enum PlayblastError {
    /// A configured base directory that must exist does not.
    #[error("configured path does not exist: {0}")]
    InvalidConfigPath(PathBuf),

    /// Configuration failed to parse or validate.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Every three-digit tag of one kind is taken.
    #[error("version space exhausted under {root}: {prefix}999 is the last tag")]
    VersionSpaceExhausted { root: PathBuf, prefix: char },

    /// No live preview version with this number.
    #[error("preview version not found: {0}")]
    VersionNotFound(u32),

    /// No publish ledger entry for this number.
    #[error("publish version not found: {0}")]
    PublishNotFound(u32),

    /// A latest version was requested from an empty tree.
    #[error("no versions exist under {0}")]
    NoVersions(PathBuf),

    /// Another writer created the same version directory first.
    #[error("version directory already exists (concurrent allocation?): {0}")]
    VersionCollision(PathBuf),

    /// The ledger file could not be opened or written.
    #[error("failed to append ledger record to {path}: {source}")]
    LedgerWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A ledger line does not match the expected layout.
    #[error("corrupt ledger line {line}: {reason}")]
    LedgerCorrupt { line: usize, reason: String },

    /// A record field would break the line format.
    #[error("ledger field {field} contains a delimiter or line break: {value:?}")]
    InvalidRecordField { field: &'static str, value: String },

    /// One file could not be copied during a publish.
    #[error("failed to copy {from} to {to}: {source}")]
    CopyFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An external program could not start or exited non-zero.
    #[error("external process {program} failed: {detail}")]
    ExternalProcessFailed { program: String, detail: String },

    /// An external program outlived its timeout and was killed.
    #[error("external process {program} timed out after {secs} seconds")]
    ExternalProcessTimeout { program: String, secs: u64 },

    /// The notification address failed local validation.
    #[error("invalid recipient address: {0}")]
    InvalidRecipientAddress(String),

    /// The mail relay refused or could not build the message.
    #[error("notification failed: {0}")]
    Notification(String),

    /// Any other I/O failure, with the path involved.
    #[error("filesystem error at {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A preview step failed.
    #[error("{stage} failed: {source}")]
    Stage {
        stage: PreviewStage,
        #[source]
        source: Box<PlayblastError>,
    },

    /// A publish step failed.
    #[error("{stage} failed: {source}")]
    PublishStep {
        stage: PublishStage,
        #[source]
        source: Box<PlayblastError>,
    },
}

impl PlayblastError {
    pub(crate) fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PlayblastError::Filesystem {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn at(stage: PreviewStage) -> impl FnOnce(PlayblastError) -> PlayblastError {
        move |source| PlayblastError::Stage {
            stage,
            source: Box::new(source),
        }
    }

    pub(crate) fn at_publish(
        stage: PublishStage,
    ) -> impl FnOnce(PlayblastError) -> PlayblastError {
        move |source| PlayblastError::PublishStep {
            stage,
            source: Box::new(source),
        }
    }

    /// The innermost error, with any stage attribution stripped.
    pub fn root_cause(&self) -> &PlayblastError {
        match self {
            PlayblastError::Stage { source, .. }
            | PlayblastError::PublishStep { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Result type for playblast operations.
pub type Result<T> = std::result::Result<T, PlayblastError>;
