//! Playblast ledger core library.
//!
//! Versioned preview directories (`p001`, `p002`, ...) per classification and
//! user, a shared append-only `.mxdb` ledger per tree, and a publish pipeline
//! that promotes previews into an independently numbered `v###` tree.

pub mod config;
pub mod error;
pub mod external;
pub mod fakes;
pub mod ledger;
pub mod obs;
pub mod paths;
pub mod preview;
pub mod publish;
pub mod telemetry;
pub mod version;
pub mod viewer;

pub use config::{
    PlayblastConfig, RenderSettings, SaveSettings, SmtpSettings, TranscodeSettings, VersionMode,
};
pub use error::{PlayblastError, PreviewStage, PublishStage, Result};
pub use external::notify::{validate_recipient, Notification, Notifier, SmtpNotifier};
pub use external::process::{run_command, CommandSpec, ProcessOutput};
pub use external::{
    CommandRenderer, FfmpegTranscoder, FrameRange, HostRenderer, RenderRequest, Renderer,
    Transcoder, FRAME_PLACEHOLDER,
};
pub use ledger::{
    find_by_version_number, parse_record, sanitize_field, CorruptLine, LedgerScan, LedgerStore,
    PreviewRecord, PublishRecord, DELIMITER, LEDGER_FILE,
};
pub use obs::VersionSpan;
pub use paths::PathResolver;
pub use preview::{AuxiliaryWarning, PlayblastReport, PreviewManager, PreviewRequest, PreviewSlot};
pub use publish::{BatchItem, BatchReport, CopyWarning, PublishManager, PublishOutcome};
pub use telemetry::init_tracing;
pub use version::{latest_version, list_versions, next_version, VersionKind, VersionTag};
pub use viewer::Viewer;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
