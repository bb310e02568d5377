//! Container query domain — inspect, stats, logs, top.

use super::client::{DockerCli, RuntimeError, READ_TIMEOUT};
use super::inventory::{truncate_bytes, ContainerInfo, ContainerStats};

/// Hard cap on the log excerpt carried in evidence bundles.
pub const LOGS_BYTE_LIMIT: usize = 2000;

impl DockerCli {
    /// Inspect a container. An absent container (or unparsable record)
    /// is `Ok(None)`, not an error — the caller treats it as "no data".
    pub async fn inspect(&self, name: &str) -> Result<Option<ContainerInfo>, RuntimeError> {
        let out = self
            .run(&["inspect", "--format", "{{json .}}", name], READ_TIMEOUT)
            .await?;
        if !out.ok() {
            return Ok(None);
        }
        Ok(ContainerInfo::from_inspect_json(name, &out.stdout))
    }

    /// One-shot stats snapshot. Missing or failing is `Ok(None)`.
    pub async fn stats(&self, name: &str) -> Result<Option<ContainerStats>, RuntimeError> {
        let out = self
            .run(
                &["stats", "--no-stream", "--format", "{{json .}}", name],
                READ_TIMEOUT,
            )
            .await?;
        if !out.ok() {
            return Ok(None);
        }
        Ok(ContainerStats::from_stats_json(&out.stdout))
    }

    /// Last `tail` lines of the container log, capped at 2000 bytes.
    ///
    /// Never fails: an unreachable container yields an explanatory string
    /// so the evidence bundle still carries *something* in `logs_tail`.
    pub async fn logs(&self, name: &str, tail: usize) -> String {
        let tail_arg = tail.to_string();
        let result = self
            .run(&["logs", "--tail", &tail_arg, name], READ_TIMEOUT)
            .await;

        let text = match result {
            Ok(out) if out.ok() => {
                // docker writes application logs to either stream
                if out.stdout.is_empty() {
                    out.stderr
                } else {
                    out.stdout
                }
            }
            Ok(out) => format!("failed to fetch logs: {}", out.stderr),
            Err(e) => format!("failed to fetch logs: {e}"),
        };
        truncate_bytes(&text, LOGS_BYTE_LIMIT).to_string()
    }

    /// Process table as reported by `docker top`.
    pub async fn top(&self, name: &str) -> Result<String, RuntimeError> {
        let out = self.run(&["top", name], READ_TIMEOUT).await?;
        if out.ok() {
            Ok(out.stdout)
        } else {
            Err(RuntimeError::CommandFailed {
                code: out.code,
                stderr: out.stderr,
            })
        }
    }
}
