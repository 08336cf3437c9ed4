//! External tool plumbing shared by the curator, PrePARE and collaborator commands.
use crate::config::ToolFailurePolicy;
use anyhow::{anyhow, Context, Result};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Output, Stdio};
use std::time::Instant;

/// Exit status of a tool whose failure is governed by `ToolFailurePolicy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolStatus {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
}

impl ToolStatus {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for ToolStatus {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

impl std::fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {code}"),
            None => write!(f, "signal"),
        }
    }
}

/// Status a shell reports for a command it could not find or start.
pub const LAUNCH_FAILED: ToolStatus = ToolStatus { code: Some(127) };

/// Run a policy-governed tool; failing to locate or start it counts as a failed run.
pub fn launch_status<F>(tool: &str, launch: F) -> ToolStatus
where
    F: FnOnce() -> Result<ToolStatus>,
{
    launch().unwrap_or_else(|err| {
        tracing::warn!(tool, error = %format!("{err:#}"), "tool could not be started");
        LAUNCH_FAILED
    })
}

/// Apply the failure policy to a finished tool run.
pub fn enforce(policy: ToolFailurePolicy, tool: &str, status: ToolStatus) -> Result<()> {
    if status.success() {
        return Ok(());
    }
    match policy {
        ToolFailurePolicy::Warn => {
            tracing::warn!(tool, status = %status, "tool failed; continuing");
            Ok(())
        }
        ToolFailurePolicy::Fail => Err(anyhow!("{tool} failed with {status}")),
    }
}

/// Resolve a program name against PATH; paths with a separator are used as-is.
pub fn resolve_program(program: &str) -> Result<PathBuf> {
    if program.contains(std::path::MAIN_SEPARATOR) {
        return Ok(PathBuf::from(program));
    }
    which::which(program).with_context(|| format!("find {program} on PATH"))
}

/// Split a configured command line into program and leading arguments.
pub fn split_command(command: &str) -> Result<(PathBuf, Vec<String>)> {
    let mut words =
        shell_words::split(command).with_context(|| format!("parse command: {command}"))?;
    if words.is_empty() {
        return Err(anyhow!("command is empty"));
    }
    let program = resolve_program(&words.remove(0))?;
    Ok((program, words))
}

/// Run a tool to completion, inheriting stdout/stderr so its output stays visible.
pub fn run_inherited<I, S>(program: &OsStr, args: I) -> Result<ToolStatus>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let start = Instant::now();
    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .status()
        .with_context(|| format!("spawn {}", program.to_string_lossy()))?;
    let elapsed_ms = start.elapsed().as_millis();
    tracing::info!(
        program = %program.to_string_lossy(),
        elapsed_ms,
        code = status.code(),
        "tool run complete"
    );
    Ok(status.into())
}

pub fn stderr_trim(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}
