//! Canonical locations of the preview and publish trees.

use std::path::{Path, PathBuf};

use crate::config::PlayblastConfig;
use crate::error::{PlayblastError, Result};

const PREVIEW_SEGMENT: &str = "preview";
const PUBLISH_SEGMENT: &str = "publish";

/// Path computation over configuration plus the document location.
#[derive(Debug, Clone)]
pub struct PathResolver {
    document_dir: PathBuf,
    preview_base: Option<PathBuf>,
    publish_base: Option<PathBuf>,
}

impl PathResolver {
    /// Resolve the bases against the current directory.
    ///
    /// Every path that ends up in a shared ledger must be absolute, so a
    /// relative document or override is anchored here once.
    pub fn new(config: &PlayblastConfig) -> Result<Self> {
        let document_dir = config
            .document
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(Self {
            document_dir: absolute(&document_dir)?,
            preview_base: config.preview_base.as_deref().map(absolute).transpose()?,
            publish_base: config.publish_base.as_deref().map(absolute).transpose()?,
        })
    }

    /// `<base>/preview/<classification>/<user>`.
    ///
    /// The directory may not exist yet; it is created lazily by the first
    /// preview.
    pub fn preview_root(&self, classification: &str, user: &str) -> PathBuf {
        self.preview_base
            .as_deref()
            .unwrap_or(&self.document_dir)
            .join(PREVIEW_SEGMENT)
            .join(classification)
            .join(user)
    }

    /// `<base>/publish`.
    ///
    /// A configured override must already exist on disk.
    pub fn publish_root(&self) -> Result<PathBuf> {
        match &self.publish_base {
            Some(base) if !base.is_dir() => Err(PlayblastError::InvalidConfigPath(base.clone())),
            Some(base) => Ok(base.join(PUBLISH_SEGMENT)),
            None => Ok(self.document_dir.join(PUBLISH_SEGMENT)),
        }
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| PlayblastError::fs(".", e))?;
    if path.as_os_str().is_empty() {
        Ok(cwd)
    } else {
        Ok(cwd.join(path))
    }
}
