//! Fake — scripted test double for container-runtime operations.
//!
//! Provides a deterministic [`FakeRuntime`] that implements
//! [`ContainerRuntime`] against in-memory state, plus a recorded call log
//! so tests can assert exactly which engine operations ran (and how many
//! times).

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;

use crate::client::runtime::ContainerRuntime;
use crate::docker::client::{CommandOutput, ExecOutput, RuntimeError};
use crate::docker::inventory::{ContainerEvent, ContainerInfo, ContainerStats};

#[derive(Default)]
struct Inner {
    containers: HashMap<String, ContainerInfo>,
    stats: HashMap<String, ContainerStats>,
    logs: HashMap<String, String>,
    tops: HashMap<String, String>,
    exec_output: Option<ExecOutput>,
    events: Vec<ContainerEvent>,
    calls: Vec<String>,
    fail_restart: bool,
    fail_stop: bool,
    fail_commit: bool,
    restart_sets_running: bool,
}

/// A fake runtime for deterministic testing.
///
/// Builder methods pre-populate containers, stats, logs, process tables,
/// and canned events. Lifecycle calls mutate the in-memory containers the
/// way the real engine would: `restart` marks the container running
/// (unless scripted to fail), `stop` marks it stopped.
pub struct FakeRuntime {
    inner: Mutex<Inner>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                restart_sets_running: true,
                ..Inner::default()
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    // ── Seeding ─────────────────────────────────────────────────

    pub fn put_container(&self, info: ContainerInfo) {
        let mut state = self.lock();
        state.containers.insert(info.name.clone(), info);
    }

    pub fn remove_container(&self, name: &str) {
        self.lock().containers.remove(name);
    }

    pub fn put_stats(&self, name: &str, stats: ContainerStats) {
        self.lock().stats.insert(name.to_string(), stats);
    }

    pub fn put_logs(&self, name: &str, logs: &str) {
        self.lock().logs.insert(name.to_string(), logs.to_string());
    }

    pub fn put_top(&self, name: &str, top: &str) {
        self.lock().tops.insert(name.to_string(), top.to_string());
    }

    pub fn put_exec_output(&self, output: ExecOutput) {
        self.lock().exec_output = Some(output);
    }

    pub fn push_event(&self, event: ContainerEvent) {
        self.lock().events.push(event);
    }

    pub fn fail_restart(&self) {
        self.lock().fail_restart = true;
    }

    pub fn fail_stop(&self) {
        self.lock().fail_stop = true;
    }

    pub fn fail_commit(&self) {
        self.lock().fail_commit = true;
    }

    /// Leave containers in their seeded state after a restart instead of
    /// marking them running. Used to script unrecoverable containers.
    pub fn restart_leaves_state(&self) {
        self.lock().restart_sets_running = false;
    }

    // ── Assertions ──────────────────────────────────────────────

    /// Every engine operation invoked so far, in order, as
    /// `"<op> <container> [arg]"` strings.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.starts_with(op))
            .count()
    }
}

impl Default for FakeRuntime {
    fn default() -> Self {
        Self::new()
    }
}

// ── ContainerRuntime implementation ─────────────────────────────

impl ContainerRuntime for FakeRuntime {
    fn inspect<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Option<ContainerInfo>, RuntimeError>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.lock();
            state.calls.push(format!("inspect {name}"));
            Ok(state.containers.get(name).cloned())
        })
    }

    fn stats<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Option<ContainerStats>, RuntimeError>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.lock();
            state.calls.push(format!("stats {name}"));
            Ok(state.stats.get(name).cloned())
        })
    }

    fn logs<'a>(
        &'a self,
        name: &'a str,
        _tail: usize,
    ) -> Pin<Box<dyn std::future::Future<Output = String> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.lock();
            state.calls.push(format!("logs {name}"));
            state.logs.get(name).cloned().unwrap_or_default()
        })
    }

    fn top<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<String, RuntimeError>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.lock();
            state.calls.push(format!("top {name}"));
            state.tops.get(name).cloned().ok_or_else(|| RuntimeError::CommandFailed {
                code: 1,
                stderr: format!("no such container: {name}"),
            })
        })
    }

    fn exec<'a>(
        &'a self,
        name: &'a str,
        _argv: &'a [String],
        _timeout: Duration,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<ExecOutput, RuntimeError>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.lock();
            state.calls.push(format!("exec {name}"));
            Ok(state.exec_output.clone().unwrap_or(ExecOutput {
                code: 0,
                stdout: String::new(),
                stderr: String::new(),
            }))
        })
    }

    fn restart<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<CommandOutput, RuntimeError>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.lock();
            state.calls.push(format!("restart {name}"));
            if state.fail_restart {
                return Ok(CommandOutput {
                    ok: false,
                    output: "Error response from daemon: restart failed".to_string(),
                });
            }
            if state.restart_sets_running {
                if let Some(info) = state.containers.get_mut(name) {
                    info.running = true;
                    info.status = "running".to_string();
                }
            }
            Ok(CommandOutput {
                ok: true,
                output: name.to_string(),
            })
        })
    }

    fn stop<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<CommandOutput, RuntimeError>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.lock();
            state.calls.push(format!("stop {name}"));
            if state.fail_stop {
                return Ok(CommandOutput {
                    ok: false,
                    output: "Error response from daemon: stop failed".to_string(),
                });
            }
            if let Some(info) = state.containers.get_mut(name) {
                info.running = false;
                info.status = "exited".to_string();
            }
            Ok(CommandOutput {
                ok: true,
                output: name.to_string(),
            })
        })
    }

    fn commit<'a>(
        &'a self,
        name: &'a str,
        tag: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<CommandOutput, RuntimeError>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.lock();
            state.calls.push(format!("commit {name} {tag}"));
            if state.fail_commit {
                return Ok(CommandOutput {
                    ok: false,
                    output: "Error response from daemon: commit failed".to_string(),
                });
            }
            Ok(CommandOutput {
                ok: true,
                output: "sha256:deadbeef".to_string(),
            })
        })
    }

    fn events(&self, stop: CancellationToken) -> Pin<Box<dyn Stream<Item = ContainerEvent> + Send>> {
        let events = self.lock().events.clone();
        Box::pin(async_stream::stream! {
            for event in events {
                yield event;
            }
            // canned events exhausted; behave like a quiet daemon
            stop.cancelled().await;
        })
    }
}
