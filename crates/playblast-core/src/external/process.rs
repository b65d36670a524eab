//! Bounded execution of external programs.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::debug;

use crate::error::{PlayblastError, Result};

/// A fully resolved command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// `None` waits for the child however long it takes.
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Bound the wait; `0` seconds means unbounded.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        self
    }
}

/// Captured result of a successful run.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

/// Spawn `spec` and wait for it.
///
/// Non-zero exit maps to [`PlayblastError::ExternalProcessFailed`] carrying the
/// tail of stderr; an expired timeout kills the child and maps to
/// [`PlayblastError::ExternalProcessTimeout`].
pub async fn run_command(spec: &CommandSpec) -> Result<ProcessOutput> {
    let start = Instant::now();

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &spec.cwd {
        cmd.current_dir(dir);
    }

    let child = cmd
        .spawn()
        .map_err(|e| PlayblastError::ExternalProcessFailed {
            program: spec.program.clone(),
            detail: format!("spawn failed: {e}"),
        })?;

    let waited = match spec.timeout {
        Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
            .await
            .map_err(|_| PlayblastError::ExternalProcessTimeout {
                program: spec.program.clone(),
                secs: limit.as_secs(),
            })?,
        None => child.wait_with_output().await,
    };
    let output = waited.map_err(|e| PlayblastError::ExternalProcessFailed {
        program: spec.program.clone(),
        detail: e.to_string(),
    })?;

    let duration_ms = start.elapsed().as_millis() as u64;
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    debug!(program = %spec.program, duration_ms, status = ?output.status.code(), "external process exited");

    if !output.status.success() {
        let code = output
            .status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        return Err(PlayblastError::ExternalProcessFailed {
            program: spec.program.clone(),
            detail: format!("exit {code}: {}", stderr_tail(&stderr)),
        });
    }

    Ok(ProcessOutput {
        stdout,
        stderr,
        duration_ms,
    })
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.trim_end().lines().collect();
    let start = lines.len().saturating_sub(5);
    lines[start..].join(" | ")
}
