//! Docker CLI handle — core struct, command runner, error types.
//!
//! Domain methods live in sibling modules (`container`, `control`,
//! `event`) which add `impl DockerCli` blocks. Every invocation is a
//! short-lived `docker` child process bounded by a timeout; a hung
//! daemon can never wedge a caller.

use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;

/// Timeout for read-only queries (inspect, stats, logs, top).
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);
/// Timeout for state-changing actions (restart, stop).
pub const ACTION_TIMEOUT: Duration = Duration::from_secs(60);
/// Timeout for `docker commit`, which copies filesystem layers.
pub const COMMIT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("docker command timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to spawn docker: {0}")]
    Spawn(String),
    #[error("docker exited with status {code}: {stderr}")]
    CommandFailed { code: i32, stderr: String },
}

/// Captured output of one CLI invocation.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn ok(&self) -> bool {
        self.code == 0
    }
}

/// Outcome of a lifecycle action (restart / stop / commit).
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub ok: bool,
    /// stdout on success, stderr otherwise.
    pub output: String,
}

impl From<ExecOutput> for CommandOutput {
    fn from(out: ExecOutput) -> Self {
        let ok = out.ok();
        CommandOutput {
            ok,
            output: if ok { out.stdout } else { out.stderr },
        }
    }
}

#[derive(Debug, Clone)]
pub struct DockerCli {
    /// Binary to invoke, normally "docker".
    binary: String,
    /// Daemon address exported as DOCKER_HOST; empty means the default socket.
    host: String,
}

impl DockerCli {
    pub fn new(host: &str) -> Self {
        let host = if host.is_empty()
            || host.starts_with("unix://")
            || host.starts_with("tcp://")
        {
            host.to_string()
        } else {
            format!("unix://{host}")
        };
        Self {
            binary: "docker".to_string(),
            host,
        }
    }

    /// Build a command for the daemon this handle points at.
    pub(super) fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        if !self.host.is_empty() {
            cmd.env("DOCKER_HOST", &self.host);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Run `docker <args>` to completion under `timeout`.
    ///
    /// A non-zero exit status is NOT an error here — callers decide what a
    /// failed invocation means. Only spawn failures and timeouts surface
    /// as `RuntimeError`.
    pub(super) async fn run(
        &self,
        args: &[&str],
        timeout: Duration,
    ) -> Result<ExecOutput, RuntimeError> {
        let mut cmd = self.command();
        cmd.args(args);

        let output = tokio::time::timeout(timeout, cmd.output())
            .await
            .map_err(|_| RuntimeError::Timeout(timeout))?
            .map_err(|e| RuntimeError::Spawn(e.to_string()))?;

        Ok(ExecOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    /// Probe daemon reachability. Used as the fatal init check.
    pub async fn ping(&self) -> Result<(), RuntimeError> {
        let out = self.run(&["version", "--format", "{{.Server.Version}}"], Duration::from_secs(5)).await?;
        if out.ok() {
            Ok(())
        } else {
            Err(RuntimeError::CommandFailed {
                code: out.code,
                stderr: out.stderr,
            })
        }
    }
}
