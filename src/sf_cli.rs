//! Salesforce CLI subprocess helper.
//!
//! Every `sf`/`sfdx` invocation goes through a [`CommandRunner`]. The
//! production runner wraps `tokio::process::Command` around the resolved
//! binary path and captures output; tests swap in a fake that returns canned
//! JSON.

use std::fmt;
use std::future::Future;
use std::process::Stdio;
use std::time::Instant;

use tokio::process::Command;
use tracing::debug;

use crate::cli::resolve_cli;
use crate::diagnostic::failure_detail;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Error from resolving, invoking or decoding the Salesforce CLI.
#[derive(Debug)]
pub enum SfError {
    /// Neither `sf` nor `sfdx` answered a `--version` probe.
    CliNotFound,
    /// The CLI process could not be spawned.
    SpawnFailed {
        program: String,
        source: std::io::Error,
    },
    /// The CLI exited unsuccessfully where the operation requires success.
    NonZeroExit {
        program: String,
        code: Option<i32>,
        detail: String,
    },
    /// Stdout was not a JSON document.
    InvalidJson(serde_json::Error),
    /// Writing the anonymous Apex source file failed.
    TempFile(std::io::Error),
    /// Host-supplied arguments had an unusable shape.
    InvalidArguments(String),
    /// The host asked for an operation the dispatcher does not know.
    UnknownOperation(String),
}

impl fmt::Display for SfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CliNotFound => {
                write!(f, "Salesforce CLI not found. Please install 'sf' or 'sfdx'.")
            }
            Self::SpawnFailed { program, source } => {
                write!(f, "Failed to spawn {program}: {source}")
            }
            Self::NonZeroExit {
                program,
                code,
                detail,
            } => {
                let code_str = code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string());
                if detail.is_empty() {
                    write!(f, "{program} exited with code {code_str}")
                } else {
                    write!(f, "{program} exited with code {code_str}: {detail}")
                }
            }
            Self::InvalidJson(e) => write!(f, "{e}"),
            Self::TempFile(e) => write!(f, "Failed to write Apex source file: {e}"),
            Self::InvalidArguments(msg) => write!(f, "{msg}"),
            Self::UnknownOperation(name) => write!(f, "Unknown operation: {name}"),
        }
    }
}

impl std::error::Error for SfError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SpawnFailed { source, .. } => Some(source),
            Self::InvalidJson(e) => Some(e),
            Self::TempFile(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SfError> for String {
    fn from(e: SfError) -> String {
        e.to_string()
    }
}

// ---------------------------------------------------------------------------
// Output type
// ---------------------------------------------------------------------------

/// Captured result of one CLI invocation, successful or not.
#[derive(Debug, Clone, Default)]
pub struct CliOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub code: Option<i32>,
}

impl CliOutput {
    /// Parse stdout as a single JSON document.
    pub fn json(&self) -> Result<serde_json::Value, SfError> {
        serde_json::from_str(self.stdout.trim()).map_err(SfError::InvalidJson)
    }

    /// Turn an unsuccessful exit into an error, keeping the output otherwise.
    pub fn require_success(self, program: &str) -> Result<Self, SfError> {
        if self.success {
            return Ok(self);
        }
        Err(SfError::NonZeroExit {
            program: program.to_string(),
            code: self.code,
            detail: failure_detail(&self.stdout, &self.stderr),
        })
    }
}

// ---------------------------------------------------------------------------
// Runner seam
// ---------------------------------------------------------------------------

/// Runs external binaries on behalf of the client.
pub trait CommandRunner: Send + Sync {
    /// Run `<program> --version` with all output discarded; true when it
    /// exits successfully.
    fn probe(&self, program: &str) -> impl Future<Output = bool> + Send;

    /// Run `<program> <args...>` to completion and capture its output.
    /// Only a spawn failure is an `Err`; exit status is reported in the output.
    fn run(
        &self,
        program: &str,
        args: &[String],
    ) -> impl Future<Output = Result<CliOutput, SfError>> + Send;
}

/// Spawns real processes via tokio.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

/// Build a command for the resolved binary with the environment every
/// invocation shares.
fn sf_command(program: &str) -> Command {
    let mut cmd = Command::new(resolve_cli(program));
    // Keep the CLI from stopping to install updates in the middle of a command.
    cmd.env("SF_AUTOUPDATE_DISABLE", "true");
    cmd.env("SFDX_AUTOUPDATE_DISABLE", "true");
    cmd.stdin(Stdio::null());
    cmd
}

impl CommandRunner for ProcessRunner {
    async fn probe(&self, program: &str) -> bool {
        let status = sf_command(program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        match status {
            Ok(status) => status.success(),
            Err(e) => {
                debug!(program, error = %e, "version probe failed to spawn");
                false
            }
        }
    }

    async fn run(&self, program: &str, args: &[String]) -> Result<CliOutput, SfError> {
        let start = Instant::now();
        let output = sf_command(program)
            .args(args)
            .output()
            .await
            .map_err(|source| SfError::SpawnFailed {
                program: program.to_string(),
                source,
            })?;

        let result = CliOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            success: output.status.success(),
            code: output.status.code(),
        };
        debug!(
            program,
            arg0 = args.first().map(String::as_str).unwrap_or_default(),
            duration_ms = start.elapsed().as_millis() as u64,
            ok = result.success,
            "sf invocation finished"
        );
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
