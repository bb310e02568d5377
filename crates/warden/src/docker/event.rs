//! Event domain — engine event streaming over the CLI.
//!
//! `docker events` is a long-lived child process whose stdout is a JSON
//! line per event. The stream reconnects after a short delay whenever the
//! child exits (daemon restart, socket hiccup) and ends only when the
//! stop token fires.

use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::client::DockerCli;
use super::inventory::ContainerEvent;

/// Sleep between reconnect attempts when the event stream drops.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

const EVENT_ARGS: &[&str] = &[
    "events",
    "--format",
    "{{json .}}",
    "--filter",
    "type=container",
    "--filter",
    "event=die",
    "--filter",
    "event=oom",
];

impl DockerCli {
    /// Stream die/oom container events until `stop` fires.
    ///
    /// Unparsable lines are skipped. Spawn failures and stream
    /// terminations are logged and retried; the stream itself never
    /// yields errors.
    pub fn events(&self, stop: CancellationToken) -> Pin<Box<dyn Stream<Item = ContainerEvent> + Send>> {
        let cli = self.clone();
        Box::pin(async_stream::stream! {
            loop {
                if stop.is_cancelled() {
                    return;
                }

                let mut cmd = cli.command();
                cmd.args(EVENT_ARGS).stderr(Stdio::null());

                let mut child = match cmd.spawn() {
                    Ok(child) => child,
                    Err(e) => {
                        warn!("failed to spawn docker events: {e}");
                        tokio::select! {
                            _ = stop.cancelled() => return,
                            _ = tokio::time::sleep(RECONNECT_DELAY) => continue,
                        }
                    }
                };

                let Some(stdout) = child.stdout.take() else {
                    let _ = child.kill().await;
                    return;
                };
                let mut lines = BufReader::new(stdout).lines();

                loop {
                    tokio::select! {
                        _ = stop.cancelled() => {
                            let _ = child.kill().await;
                            return;
                        }
                        line = lines.next_line() => match line {
                            Ok(Some(line)) => {
                                match ContainerEvent::from_json_line(&line) {
                                    Some(event) => yield event,
                                    None => debug!("skipping unparsable event line"),
                                }
                            }
                            Ok(None) | Err(_) => break,
                        }
                    }
                }

                let _ = child.kill().await;
                warn!("docker events stream ended, reconnecting in {RECONNECT_DELAY:?}");
                tokio::select! {
                    _ = stop.cancelled() => return,
                    _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                }
            }
        })
    }
}
