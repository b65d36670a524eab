//! End-to-end preview creation against a throwaway directory tree.

use std::fs;
use std::sync::Arc;

use playblast_core::fakes::{
    FailingRenderer, MemoryNotifier, RecordingRenderer, RecordingTranscoder,
};
use playblast_core::{
    FrameRange, LedgerStore, PlayblastConfig, PlayblastError, PreviewManager, PreviewRecord,
    PreviewRequest, PreviewStage, VersionMode,
};

fn config(dir: &std::path::Path) -> PlayblastConfig {
    PlayblastConfig::new(dir.join("sh010").join("smoke.hip"), "fx").with_user("alice")
}

fn request(note: &str) -> PreviewRequest {
    PreviewRequest {
        classification: "fx".to_string(),
        user: "alice".to_string(),
        note: note.to_string(),
        mode: VersionMode::CreateNew,
    }
}

#[test]
fn first_preview_writes_expected_ledger_line() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = PreviewManager::new(config(dir.path()), Arc::new(RecordingRenderer::new())).unwrap();

    let slot = mgr.create_preview(&request("blocking pass")).unwrap();
    let root = dir.path().join("sh010/preview/fx/alice");
    assert!(root.join("p001").is_dir());
    assert_eq!(slot.tag, "p001");
    assert!(slot.artifact_template.contains("$F3"));
    assert!(slot.artifact_template.ends_with(".png"));

    let raw = fs::read_to_string(root.join(".mxdb")).unwrap();
    assert_eq!(
        raw,
        format!(
            "\np001=1=blocking pass=alice={}=fx",
            slot.artifact_template
        )
    );
}

#[test]
fn successive_previews_number_without_gaps() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = PreviewManager::new(config(dir.path()), Arc::new(RecordingRenderer::new())).unwrap();

    let tags: Vec<String> = (0..5)
        .map(|i| mgr.create_preview(&request(&format!("take {i}"))).unwrap().tag)
        .collect();
    assert_eq!(tags, vec!["p001", "p002", "p003", "p004", "p005"]);

    let history = mgr.history("fx", "alice").unwrap();
    let numbers: Vec<u32> = history.iter().map(|r| r.version_number).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
    assert_eq!(history[2].note, "take 2");
}

#[test]
fn reuse_latest_appends_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = PreviewManager::new(config(dir.path()), Arc::new(RecordingRenderer::new())).unwrap();
    mgr.create_preview(&request("a")).unwrap();
    let second = mgr.create_preview(&request("b")).unwrap();

    let ledger = LedgerStore::in_root(mgr.preview_root("fx", "alice"));
    let before = fs::read_to_string(ledger.path()).unwrap();

    let reused = mgr
        .create_preview(&request("ignored").with_mode(VersionMode::ReuseLatest))
        .unwrap();
    assert!(!reused.created);
    assert_eq!(reused.tag, "p002");
    assert_eq!(reused.artifact_template, second.artifact_template);
    assert_eq!(fs::read_to_string(ledger.path()).unwrap(), before);
}

#[test]
fn orphan_directory_is_numbered_past() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = PreviewManager::new(config(dir.path()), Arc::new(RecordingRenderer::new())).unwrap();
    mgr.create_preview(&request("a")).unwrap();

    // A crashed writer left p002 without a ledger line.
    fs::create_dir(mgr.preview_root("fx", "alice").join("p002")).unwrap();

    let slot = mgr.create_preview(&request("c")).unwrap();
    assert_eq!(slot.tag, "p003");
    let history = mgr.history("fx", "alice").unwrap();
    let tags: Vec<&str> = history.iter().map(|r| r.version_tag.as_str()).collect();
    assert_eq!(tags, vec!["p001", "p003"]);
}

#[test]
fn users_and_classifications_have_separate_trees() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = PreviewManager::new(config(dir.path()), Arc::new(RecordingRenderer::new())).unwrap();
    mgr.create_preview(&request("a")).unwrap();

    let mut bob = request("b");
    bob.user = "bob".to_string();
    assert_eq!(mgr.create_preview(&bob).unwrap().tag, "p001");

    let mut dust = request("d");
    dust.classification = "dust".to_string();
    assert_eq!(mgr.create_preview(&dust).unwrap().tag, "p001");
}

#[test]
fn unwritable_artifact_path_fails_at_ledger_step() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path());
    cfg.preview_base = Some(dir.path().join("odd=base"));
    let mgr = PreviewManager::new(cfg, Arc::new(RecordingRenderer::new())).unwrap();

    let err = mgr.create_preview(&request("a")).unwrap_err();
    match &err {
        PlayblastError::Stage { stage, .. } => assert_eq!(*stage, PreviewStage::AppendLedger),
        other => panic!("expected stage error, got {other:?}"),
    }
    assert!(matches!(
        err.root_cause(),
        PlayblastError::InvalidRecordField { field: "artifact_path", .. }
    ));
}

#[tokio::test]
async fn playblast_renders_into_slot() {
    let dir = tempfile::tempdir().unwrap();
    let renderer = Arc::new(RecordingRenderer::writing_frames());
    let mgr = PreviewManager::new(config(dir.path()), renderer.clone()).unwrap();

    let report = mgr
        .playblast(&request("anim"), FrameRange::new(1, 3).unwrap())
        .await
        .unwrap();
    assert!(report.warnings.is_empty());
    assert!(report.movie.is_none());

    let requests = renderer.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].artifact_template, report.slot.artifact_template);
    let frames = fs::read_dir(&report.slot.directory).unwrap().count();
    assert_eq!(frames, 3);
}

#[tokio::test]
async fn render_failure_is_fatal_but_version_remains() {
    let dir = tempfile::tempdir().unwrap();
    let mgr = PreviewManager::new(config(dir.path()), Arc::new(FailingRenderer)).unwrap();

    let err = mgr
        .playblast(&request("x"), FrameRange::new(1, 2).unwrap())
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("render failed"));

    let scan = LedgerStore::in_root(mgr.preview_root("fx", "alice"))
        .read_all::<PreviewRecord>()
        .unwrap();
    assert_eq!(scan.records.len(), 1);
}

#[tokio::test]
async fn auxiliary_failures_become_warnings() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path());
    cfg.build_movie = true;
    cfg.notify = true;
    cfg.recipient = Some("not-an-address".to_string());

    let transcoder = Arc::new(RecordingTranscoder::failing());
    let notifier = Arc::new(MemoryNotifier::new());
    let mgr = PreviewManager::new(cfg, Arc::new(RecordingRenderer::new()))
        .unwrap()
        .with_transcoder(transcoder.clone())
        .with_notifier(notifier.clone());

    let report = mgr
        .playblast(&request("x"), FrameRange::new(1, 1).unwrap())
        .await
        .unwrap();

    let steps: Vec<&str> = report.warnings.iter().map(|w| w.step).collect();
    assert_eq!(steps, vec!["transcode", "notify"]);
    assert!(report.movie.is_none());
    assert!(!report.notified);
    assert_eq!(transcoder.calls().len(), 1);
    assert!(notifier.sent().is_empty(), "invalid address must not reach the relay");
}

#[tokio::test]
async fn movie_and_notification_on_success() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path());
    cfg.build_movie = true;
    cfg.notify = true;
    cfg.incremental_save = true;
    cfg.recipient = Some("lead@studio.com".to_string());

    let renderer = Arc::new(RecordingRenderer::new());
    let transcoder = Arc::new(RecordingTranscoder::new());
    let notifier = Arc::new(MemoryNotifier::new());
    let mgr = PreviewManager::new(cfg, renderer.clone())
        .unwrap()
        .with_transcoder(transcoder.clone())
        .with_notifier(notifier.clone());

    let report = mgr
        .playblast(&request("x"), FrameRange::new(1, 1).unwrap())
        .await
        .unwrap();

    assert!(report.warnings.is_empty());
    let movie = report.movie.unwrap();
    assert_eq!(movie, report.slot.directory.join("smoke.mp4"));
    assert_eq!(transcoder.calls()[0].0, report.slot.artifact_template);
    assert_eq!(renderer.save_count(), 1);

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, "lead@studio.com");
    assert!(sent[0].body.contains(&report.slot.artifact_template));
}

#[tokio::test]
async fn failed_document_save_is_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path());
    cfg.incremental_save = true;

    let renderer = Arc::new(RecordingRenderer::failing_save());
    let mgr = PreviewManager::new(cfg, renderer.clone()).unwrap();

    let report = mgr
        .playblast(&request("x"), FrameRange::new(1, 2).unwrap())
        .await
        .unwrap();

    let steps: Vec<&str> = report.warnings.iter().map(|w| w.step).collect();
    assert_eq!(steps, vec!["save_document"]);
    assert!(report.warnings[0].message.contains("document is read-only"));
    assert_eq!(renderer.save_count(), 1);
    assert_eq!(renderer.requests().len(), 1);

    let history = mgr.history("fx", "alice").unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].version_tag, report.slot.tag);
    assert!(report.slot.directory.is_dir());
}

#[test]
fn notify_without_relay_host_is_rejected_up_front() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path());
    cfg.notify = true;
    cfg.recipient = Some("lead@studio.com".to_string());
    cfg.smtp.host = String::new();

    let err = PreviewManager::new(cfg, Arc::new(RecordingRenderer::new()))
        .err()
        .unwrap();
    assert!(matches!(err, PlayblastError::Config(_)));
    assert!(!dir.path().join("sh010/preview").exists());
}
