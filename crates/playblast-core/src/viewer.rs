//! Image-sequence players used to review a preview or publish.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::external::process::CommandSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Viewer {
    #[default]
    Mplay,
    Rv,
    Djv,
}

impl Viewer {
    /// Command that opens `artifact`. RV is pointed at the frame directory,
    /// the others at the templated sequence.
    pub fn command(&self, artifact: &str) -> CommandSpec {
        match self {
            Viewer::Mplay => CommandSpec::new("mplay").arg(artifact),
            Viewer::Rv => {
                let dir = Path::new(artifact)
                    .parent()
                    .map(|p| p.to_string_lossy().into_owned())
                    .unwrap_or_else(|| artifact.to_string());
                CommandSpec::new("rv").arg(dir)
            }
            Viewer::Djv => CommandSpec::new("djv_view").arg(artifact),
        }
    }
}
