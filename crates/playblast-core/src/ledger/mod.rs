//! Append-only flat-file ledger (`.mxdb`).
//!
//! One ledger lives at the root of each version tree and is shared by every
//! user writing into that tree. There is no lock: each record goes out as a
//! single `write` on a file opened in append mode, which local filesystems
//! apply atomically for writes of this size. Readers tolerate a torn or
//! foreign line by skipping it.
//!
//! The race window that remains is version allocation itself: two processes
//! that scan the tree at the same moment can pick the same tag. Directory
//! creation detects that case (see [`crate::version::create_version_dir`]);
//! nothing here tries to paper over it. On network filesystems (NFS in
//! particular) append atomicity is not guaranteed across machines.

pub mod record;

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

pub use record::{
    encode_record, find_by_publish_number, find_by_version_number, parse_record, sanitize_field,
    LedgerRecord, PreviewRecord, PublishRecord,
};

use crate::error::{PlayblastError, Result};

/// Field separator within a ledger line.
pub const DELIMITER: char = '=';

/// File name of the ledger inside a version tree root.
pub const LEDGER_FILE: &str = ".mxdb";

/// Timestamp format used in ledger lines and notices.
pub const TIMESTAMP_FORMAT: &str = "%a, %d %b %Y %H:%M:%S";

/// Current local time in [`TIMESTAMP_FORMAT`].
pub fn ledger_timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// A line that could not be parsed and was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorruptLine {
    /// 1-based line number in the file.
    pub line: usize,
    pub reason: String,
}

impl From<CorruptLine> for PlayblastError {
    fn from(c: CorruptLine) -> Self {
        PlayblastError::LedgerCorrupt {
            line: c.line,
            reason: c.reason,
        }
    }
}

/// Result of reading a ledger: parsed records plus whatever was skipped.
#[derive(Debug, Clone)]
pub struct LedgerScan<R> {
    pub records: Vec<R>,
    pub corrupt: Vec<CorruptLine>,
}

impl<R> Default for LedgerScan<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            corrupt: Vec::new(),
        }
    }
}

/// Handle on one `.mxdb` file.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    /// Ledger stored directly under `root`.
    pub fn in_root(root: impl AsRef<Path>) -> Self {
        Self {
            path: root.as_ref().join(LEDGER_FILE),
        }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a newline-prefixed line.
    ///
    /// The line is assembled in memory and handed to the OS in one call so
    /// concurrent appenders never interleave inside a record.
    pub fn append<R: LedgerRecord>(&self, record: &R) -> Result<()> {
        let line = encode_record(record)?;
        let buf = format!("\n{line}");

        let write_err = |source| PlayblastError::LedgerWrite {
            path: self.path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(write_err)?;
        file.write_all(buf.as_bytes()).map_err(write_err)?;

        debug!(ledger = %self.path.display(), bytes = buf.len(), "ledger line appended");
        Ok(())
    }

    /// Raw non-empty lines in append order. A missing file reads as empty.
    pub fn read_lines(&self) -> Result<Vec<(usize, String)>> {
        let content = match fs::read(&self.path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PlayblastError::fs(&self.path, e)),
        };

        Ok(content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| (idx + 1, line.to_string()))
            .collect())
    }

    /// Parse every line, skipping (and reporting) the ones that do not fit `R`.
    pub fn read_all<R: LedgerRecord>(&self) -> Result<LedgerScan<R>> {
        let mut scan = LedgerScan::default();
        for (line_no, line) in self.read_lines()? {
            match parse_record::<R>(&line) {
                Ok(record) => scan.records.push(record),
                Err(reason) => {
                    warn!(
                        event = "ledger.corrupt_line",
                        ledger = %self.path.display(),
                        line = line_no,
                        reason = %reason,
                    );
                    scan.corrupt.push(CorruptLine {
                        line: line_no,
                        reason,
                    });
                }
            }
        }
        Ok(scan)
    }

    /// Preview record for `number`, earliest append first.
    pub fn find_preview(&self, number: u32) -> Result<Option<PreviewRecord>> {
        let scan = self.read_all::<PreviewRecord>()?;
        Ok(find_by_version_number(&scan.records, number).cloned())
    }

    /// Publish record for `v<number>`, earliest append first.
    pub fn find_publish(&self, number: u32) -> Result<Option<PublishRecord>> {
        let scan = self.read_all::<PublishRecord>()?;
        Ok(find_by_publish_number(&scan.records, number).cloned())
    }
}
