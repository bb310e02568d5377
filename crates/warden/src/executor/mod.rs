//! Executor — whitelisted action dispatch with post-condition checks.

pub mod commit;
pub mod model;
pub mod restart;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{info, warn};

use crate::client::runtime::ContainerRuntime;
use crate::conf::WardenConfig;
use crate::evidence::health::HealthChecker;

use model::{ActionResult, StopVerification};

/// Settle time before re-inspecting a stopped container.
const STOP_SETTLE: Duration = Duration::from_secs(3);

/// Commands the executor knows how to run. The config whitelist narrows
/// this set further; it can never widen it.
const KNOWN_COMMANDS: &[&str] = &["RESTART", "STOP", "INSPECT", "COMMIT"];

pub struct Executor {
    runtime: Arc<dyn ContainerRuntime>,
    health: HealthChecker,
    config: Arc<WardenConfig>,
    /// Container → last forensic commit attempt. Armed on every attempt,
    /// successful or not.
    commit_cooldowns: DashMap<String, DateTime<Utc>>,
}

impl Executor {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, config: Arc<WardenConfig>) -> Self {
        let health = HealthChecker::new(Arc::clone(&runtime));
        Self {
            runtime,
            health,
            config,
            commit_cooldowns: DashMap::new(),
        }
    }

    /// Execute a remediation command against a container.
    ///
    /// Anything outside the configured whitelist (or outside the known
    /// command set) is rejected before the runtime is touched.
    pub async fn execute(&self, command: &str, name: &str) -> ActionResult {
        let command = command.trim().to_uppercase();

        let allowed = self
            .config
            .executor
            .allowed_actions
            .iter()
            .any(|a| a.eq_ignore_ascii_case(&command));
        if !allowed || !KNOWN_COMMANDS.contains(&command.as_str()) {
            warn!(container = name, command = %command, "rejected non-whitelisted command");
            return ActionResult::rejected(&command, name, format!("command not allowed: {command}"));
        }

        info!(container = name, command = %command, "executing action");
        match command.as_str() {
            "RESTART" => self.restart_with_retry(name).await,
            "COMMIT" => self.commit_forensics(name).await,
            "STOP" => self.execute_stop(name).await,
            _ => self.execute_inspect(name).await,
        }
    }

    /// Single-shot STOP with post-verification after a short settle.
    pub(crate) async fn execute_stop(&self, name: &str) -> ActionResult {
        let mut result = ActionResult::base("STOP", name);

        match self.runtime.stop(name).await {
            Ok(out) => {
                result.success = out.ok;
                result.output = Some(out.output);
            }
            Err(e) => {
                result.error = Some(e.to_string());
                return result;
            }
        }

        tokio::time::sleep(STOP_SETTLE).await;
        let is_stopped = match self.runtime.inspect(name).await {
            Ok(Some(info)) => !info.running,
            Ok(None) => true,
            Err(_) => false,
        };
        result.verification = Some(StopVerification {
            is_stopped,
            reason: if is_stopped {
                "container is stopped".to_string()
            } else {
                "container is still running".to_string()
            },
        });
        result
    }

    async fn execute_inspect(&self, name: &str) -> ActionResult {
        let mut result = ActionResult::base("INSPECT", name);
        match self.runtime.inspect(name).await {
            Ok(Some(info)) => {
                result.success = true;
                result.output = serde_json::to_string(&info).ok();
            }
            Ok(None) => {
                result.error = Some(format!("no such container: {name}"));
            }
            Err(e) => {
                result.error = Some(e.to_string());
            }
        }
        result
    }
}
