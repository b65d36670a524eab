//! Structured tracing emitted by the preview and publish lifecycles.

use std::path::Path;
use std::sync::Arc;

use playblast_core::fakes::RecordingRenderer;
use playblast_core::obs::{
    emit_auxiliary_failure, emit_batch_finished, emit_copy_skipped, emit_ledger_appended,
    emit_preview_allocated, emit_publish_completed,
};
use playblast_core::{
    LedgerStore, PlayblastConfig, PreviewManager, PreviewRecord, PreviewRequest, VersionSpan,
};
use tracing_test::traced_test;

#[traced_test]
#[test]
fn lifecycle_emitters_log_event_names() {
    emit_preview_allocated("p001", Path::new("/tmp/preview/fx/alice/p001"), false);
    emit_ledger_appended(Path::new("/tmp/preview/fx/alice/.mxdb"), "p001");
    emit_publish_completed("v001", "p001", 10, 0);
    emit_batch_finished(3, 1);

    assert!(logs_contain("preview.allocated"));
    assert!(logs_contain("ledger.appended"));
    assert!(logs_contain("publish.completed"));
    assert!(logs_contain("publish.batch_finished"));
}

#[traced_test]
#[test]
fn warnings_for_recovered_failures() {
    emit_auxiliary_failure("transcode", &"codec not found");
    emit_copy_skipped(Path::new("/tmp/p001/a.001.png"), &"permission denied");

    assert!(logs_contain("auxiliary.failed"));
    assert!(logs_contain("codec not found"));
    assert!(logs_contain("publish.copy_skipped"));
}

#[traced_test]
#[test]
fn version_span_wraps_events() {
    let span = VersionSpan::enter("preview", Path::new("/tmp/preview/fx/alice"));
    emit_preview_allocated("p002", Path::new("/tmp/preview/fx/alice/p002"), true);
    drop(span);
    assert!(logs_contain("playblast"));
}

#[traced_test]
#[test]
fn corrupt_line_is_logged() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".mxdb"), "\ngarbage").unwrap();
    let scan = LedgerStore::in_root(dir.path())
        .read_all::<PreviewRecord>()
        .unwrap();
    assert!(scan.records.is_empty());
    assert!(logs_contain("ledger.corrupt_line"));
}

#[traced_test]
#[test]
fn create_preview_emits_allocation_and_append() {
    let dir = tempfile::tempdir().unwrap();
    let config = PlayblastConfig::new(dir.path().join("smoke.hip"), "fx").with_user("alice");
    let mgr = PreviewManager::new(config.clone(), Arc::new(RecordingRenderer::new())).unwrap();
    mgr.create_preview(&PreviewRequest::from_config(&config, "n"))
        .unwrap();

    assert!(logs_contain("preview.allocated"));
    assert!(logs_contain("ledger.appended"));
}
