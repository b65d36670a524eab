//! Version tags and slot allocation.
//!
//! Version directories are named `<letter><3 digits>`: `p001` for previews,
//! `v001` for publishes. Listing only ever looks at immediate subdirectories
//! and ignores anything that does not match the pattern exactly, so stray
//! folders (`p01`, `preview2`, `p1000`) never influence numbering.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{PlayblastError, Result};

/// Largest number representable by the fixed-width scheme.
pub const MAX_VERSION: u32 = 999;

/// Which tree a version belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionKind {
    Preview,
    Publish,
}

impl VersionKind {
    pub fn prefix(self) -> char {
        match self {
            VersionKind::Preview => 'p',
            VersionKind::Publish => 'v',
        }
    }

    fn from_prefix(c: char) -> Option<Self> {
        match c {
            'p' => Some(VersionKind::Preview),
            'v' => Some(VersionKind::Publish),
            _ => None,
        }
    }
}

/// A parsed version directory name such as `p003`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VersionTag {
    kind: VersionKind,
    number: u32,
}

impl VersionTag {
    /// Build a tag, rejecting numbers that do not fit in three digits.
    pub fn new(kind: VersionKind, number: u32) -> Option<Self> {
        (number <= MAX_VERSION).then_some(Self { kind, number })
    }

    /// The first tag of a fresh tree.
    pub fn first(kind: VersionKind) -> Self {
        Self { kind, number: 1 }
    }

    pub fn kind(&self) -> VersionKind {
        self.kind
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    /// The following tag, or `None` past `999`.
    pub fn successor(&self) -> Option<Self> {
        Self::new(self.kind, self.number + 1)
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.kind.prefix(), self.number)
    }
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([pv])([0-9]{3})$").expect("static regex"))
}

impl FromStr for VersionTag {
    type Err = PlayblastError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || PlayblastError::Config(format!("not a version tag: {s:?}"));
        let caps = tag_pattern().captures(s).ok_or_else(invalid)?;
        let kind = caps[1]
            .chars()
            .next()
            .and_then(VersionKind::from_prefix)
            .ok_or_else(invalid)?;
        let number = caps[2].parse::<u32>().map_err(|_| invalid())?;
        Ok(Self { kind, number })
    }
}

/// List version directories of `kind` directly under `root`, in ascending order.
///
/// A missing root yields an empty list.
pub fn list_versions(root: &Path, kind: VersionKind) -> Result<Vec<VersionTag>> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(PlayblastError::fs(root, e)),
    };

    let mut tags = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| PlayblastError::fs(root, e))?;
        let is_dir = entry
            .file_type()
            .map_err(|e| PlayblastError::fs(entry.path(), e))?
            .is_dir();
        if !is_dir {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        if let Ok(tag) = name.parse::<VersionTag>() {
            if tag.kind == kind {
                tags.push(tag);
            }
        }
    }
    tags.sort();
    Ok(tags)
}

/// Highest existing version of `kind` under `root`, if any.
pub fn latest_version(root: &Path, kind: VersionKind) -> Result<Option<VersionTag>> {
    Ok(list_versions(root, kind)?.pop())
}

/// The tag a new version under `root` should take.
pub fn next_version(root: &Path, kind: VersionKind) -> Result<VersionTag> {
    match latest_version(root, kind)? {
        None => Ok(VersionTag::first(kind)),
        Some(latest) => latest
            .successor()
            .ok_or_else(|| PlayblastError::VersionSpaceExhausted {
                root: root.to_path_buf(),
                prefix: kind.prefix(),
            }),
    }
}

/// Create the directory for `tag` under `root`.
///
/// Uses a non-recursive create so that two writers racing for the same tag
/// are detected: the loser gets [`PlayblastError::VersionCollision`] instead of
/// silently sharing the directory.
pub fn create_version_dir(root: &Path, tag: VersionTag) -> Result<std::path::PathBuf> {
    let dir = root.join(tag.to_string());
    match fs::create_dir(&dir) {
        Ok(()) => Ok(dir),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            Err(PlayblastError::VersionCollision(dir))
        }
        Err(e) => Err(PlayblastError::fs(dir, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mkdirs(root: &Path, names: &[&str]) {
        for name in names {
            fs::create_dir_all(root.join(name)).unwrap();
        }
    }

    #[test]
    fn tag_display_is_zero_padded() {
        let tag = VersionTag::new(VersionKind::Preview, 3).unwrap();
        assert_eq!(tag.to_string(), "p003");
        let tag = VersionTag::new(VersionKind::Publish, 42).unwrap();
        assert_eq!(tag.to_string(), "v042");
    }

    #[test]
    fn tag_parse_is_strict() {
        assert_eq!("p007".parse::<VersionTag>().unwrap().number(), 7);
        assert_eq!(
            "v120".parse::<VersionTag>().unwrap().kind(),
            VersionKind::Publish
        );
        for bad in ["p01", "p1000", "preview2", "P001", "x001", "p00a", " p001", ""] {
            assert!(bad.parse::<VersionTag>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn successor_stops_at_999() {
        let last = VersionTag::new(VersionKind::Preview, 999).unwrap();
        assert!(last.successor().is_none());
        assert!(VersionTag::new(VersionKind::Preview, 1000).is_none());
    }

    #[test]
    fn list_filters_names_and_kinds() {
        let dir = tempfile::tempdir().unwrap();
        mkdirs(
            dir.path(),
            &["p002", "p001", "p01", "preview2", "p1000", "v001", "p010"],
        );
        fs::write(dir.path().join("p003"), b"not a directory").unwrap();
        fs::write(dir.path().join(".mxdb"), b"").unwrap();

        let tags: Vec<String> = list_versions(dir.path(), VersionKind::Preview)
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(tags, vec!["p001", "p002", "p010"]);
    }

    #[test]
    fn list_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let tags = list_versions(&dir.path().join("nope"), VersionKind::Preview).unwrap();
        assert!(tags.is_empty());
    }

    #[test]
    fn next_on_empty_root_is_first() {
        let dir = tempfile::tempdir().unwrap();
        let tag = next_version(dir.path(), VersionKind::Publish).unwrap();
        assert_eq!(tag.to_string(), "v001");
    }

    #[test]
    fn next_uses_maximum_not_count() {
        let dir = tempfile::tempdir().unwrap();
        mkdirs(dir.path(), &["p001", "p004"]);
        let tag = next_version(dir.path(), VersionKind::Preview).unwrap();
        assert_eq!(tag.to_string(), "p005");
    }

    #[test]
    fn sequential_allocation_has_no_gaps() {
        let dir = tempfile::tempdir().unwrap();
        let mut seen = Vec::new();
        for _ in 0..12 {
            let tag = next_version(dir.path(), VersionKind::Preview).unwrap();
            create_version_dir(dir.path(), tag).unwrap();
            seen.push(tag.number());
        }
        assert_eq!(seen, (1..=12).collect::<Vec<_>>());
    }

    #[test]
    fn next_after_999_is_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        mkdirs(dir.path(), &["p999"]);
        match next_version(dir.path(), VersionKind::Preview) {
            Err(PlayblastError::VersionSpaceExhausted { prefix, .. }) => assert_eq!(prefix, 'p'),
            other => panic!("expected VersionSpaceExhausted, got {other:?}"),
        }
    }

    #[test]
    fn latest_is_explicitly_absent() {
        let dir = tempfile::tempdir().unwrap();
        mkdirs(dir.path(), &["v001"]);
        assert!(latest_version(dir.path(), VersionKind::Preview)
            .unwrap()
            .is_none());
    }

    #[test]
    fn create_existing_dir_is_collision() {
        let dir = tempfile::tempdir().unwrap();
        let tag = VersionTag::first(VersionKind::Preview);
        create_version_dir(dir.path(), tag).unwrap();
        assert!(matches!(
            create_version_dir(dir.path(), tag),
            Err(PlayblastError::VersionCollision(_))
        ));
    }
}
