//! In-process stand-ins for the external seams (testing only).
//!
//! `RecordingRenderer` can write one small file per frame so that publish
//! flows have something real to copy. `MemoryNotifier` captures notices.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;

use crate::error::{PlayblastError, Result};
use crate::external::notify::{Notification, Notifier};
use crate::external::{RenderRequest, Renderer, Transcoder, FRAME_PLACEHOLDER};

/// Records every request; optionally materializes the frames.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    write_frames: bool,
    fail_save: bool,
    requests: Mutex<Vec<RenderRequest>>,
    saves: Mutex<usize>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `<template with frame number>` for every frame in the range.
    pub fn writing_frames() -> Self {
        Self {
            write_frames: true,
            ..Self::default()
        }
    }

    /// Renders fine, but every document save fails.
    pub fn failing_save() -> Self {
        Self {
            fail_save: true,
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<RenderRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|n| *n).unwrap_or_default()
    }
}

/// Frame file path for `frame` under a `$F3` template.
pub fn frame_path(template: &str, frame: i64) -> PathBuf {
    PathBuf::from(template.replace(FRAME_PLACEHOLDER, &format!("{frame:03}")))
}

#[async_trait]
impl Renderer for RecordingRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<()> {
        if self.write_frames {
            for frame in request.frames.start..=request.frames.end {
                let path = frame_path(&request.artifact_template, frame);
                fs::write(&path, format!("frame {frame}"))
                    .map_err(|e| PlayblastError::fs(&path, e))?;
            }
        }
        self.requests
            .lock()
            .map_err(|_| PlayblastError::Config("renderer lock poisoned".to_string()))?
            .push(request.clone());
        Ok(())
    }

    async fn save_document(&self) -> Result<()> {
        if let Ok(mut n) = self.saves.lock() {
            *n += 1;
        }
        if self.fail_save {
            return Err(PlayblastError::ExternalProcessFailed {
                program: "fake-save".to_string(),
                detail: "document is read-only".to_string(),
            });
        }
        Ok(())
    }
}

/// Renderer whose render always fails.
#[derive(Debug, Default)]
pub struct FailingRenderer;

#[async_trait]
impl Renderer for FailingRenderer {
    async fn render(&self, _request: &RenderRequest) -> Result<()> {
        Err(PlayblastError::ExternalProcessFailed {
            program: "fake-render".to_string(),
            detail: "viewport unavailable".to_string(),
        })
    }
}

/// Records `(frames, movie)` pairs; fails every call when built with `failing`.
#[derive(Debug, Default)]
pub struct RecordingTranscoder {
    fail: bool,
    calls: Mutex<Vec<(String, PathBuf)>>,
}

impl RecordingTranscoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, PathBuf)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Transcoder for RecordingTranscoder {
    async fn transcode(&self, frames: &str, movie: &Path) -> Result<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((frames.to_string(), movie.to_path_buf()));
        }
        if self.fail {
            return Err(PlayblastError::ExternalProcessFailed {
                program: "fake-encoder".to_string(),
                detail: "codec not found".to_string(),
            });
        }
        Ok(())
    }
}

/// Keeps every notification in memory instead of delivering it.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: RwLock<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.read().map(|v| v.clone()).unwrap_or_default()
    }
}

impl Notifier for MemoryNotifier {
    fn send(&self, notification: &Notification) -> Result<()> {
        self.sent
            .write()
            .map_err(|_| PlayblastError::Notification("notifier lock poisoned".to_string()))?
            .push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_notifier_records() {
        let notifier = MemoryNotifier::new();
        let n = Notification::playblast_done("a@b.com", "u", "s", "t", "p");
        notifier.send(&n).unwrap();
        assert_eq!(notifier.sent(), vec![n]);
    }
}
