//! RESTART with retry-and-verification.
//!
//! Each attempt restarts the container, waits out the per-container
//! delay, and then verifies the post-conditions: running, stats
//! available, CPU and memory back under the recovery limits, and the
//! configured health check passing. The first fully-verified attempt
//! wins; exhausting the retries stops the container as a last resort.

use std::time::Duration;

use tracing::{info, warn};

use crate::docker::inventory::parse_percent;

use super::model::{ActionResult, RestartAttempt};
use super::Executor;

const DEFAULT_MAX_RETRIES: usize = 3;
const DEFAULT_RESTART_DELAY_SECS: u64 = 10;

/// A container that comes back above these is not considered recovered.
const RECOVERY_CPU_LIMIT: f64 = 65.0;
const RECOVERY_MEMORY_LIMIT: f64 = 65.0;

impl Executor {
    pub(super) async fn restart_with_retry(&self, name: &str) -> ActionResult {
        let container_config = self.config.container(name);
        let policy = container_config.and_then(|c| c.policy.as_ref());
        let max_retries = policy
            .and_then(|p| p.max_retries)
            .unwrap_or(DEFAULT_MAX_RETRIES);
        let delay = Duration::from_secs(
            policy
                .and_then(|p| p.restart_delay_seconds)
                .unwrap_or(DEFAULT_RESTART_DELAY_SECS),
        );
        let health_config = container_config.and_then(|c| c.health_check.as_ref());

        let mut attempts: Vec<RestartAttempt> = Vec::new();

        for attempt in 1..=max_retries {
            let mut record = RestartAttempt::new(attempt);

            match self.runtime.restart(name).await {
                Ok(out) if out.ok => {
                    record.restart_success = true;
                }
                Ok(out) => {
                    record.reason = Some(out.output);
                    attempts.push(record);
                    continue;
                }
                Err(e) => {
                    record.reason = Some(e.to_string());
                    attempts.push(record);
                    continue;
                }
            }

            tokio::time::sleep(delay).await;

            // running?
            let running = matches!(self.runtime.inspect(name).await, Ok(Some(info)) if info.running);
            record.running = Some(running);
            if !running {
                record.reason = Some("container is not running".to_string());
                attempts.push(record);
                continue;
            }

            // resource usage back to sane levels?
            let Ok(Some(stats)) = self.runtime.stats(name).await else {
                record.reason = Some("stats unavailable after restart".to_string());
                attempts.push(record);
                continue;
            };
            let cpu = parse_percent(&stats.cpu_percent);
            let memory = parse_percent(&stats.memory_percent);
            record.cpu_percent = Some(stats.cpu_percent.clone());
            record.memory_percent = Some(stats.memory_percent.clone());

            // health check, when configured
            let health = match health_config {
                Some(config) => self.health.check(name, config).await,
                None => crate::evidence::model::HealthStatus::default(),
            };
            record.health_check = Some(health.clone());

            let (flag, reason) = if !health.healthy {
                (1, format!("health check failed: {}", health.message))
            } else if cpu > RECOVERY_CPU_LIMIT {
                (2, format!("CPU usage too high ({} > {RECOVERY_CPU_LIMIT}%)", stats.cpu_percent))
            } else if memory > RECOVERY_MEMORY_LIMIT {
                (3, format!("memory usage too high ({} > {RECOVERY_MEMORY_LIMIT}%)", stats.memory_percent))
            } else {
                (0, String::new())
            };

            if flag > 0 {
                record.failure_flag = Some(flag);
                record.reason = Some(reason);
                attempts.push(record);
                continue;
            }

            attempts.push(record);
            info!(container = name, attempt, "restart verified");

            let mut result = ActionResult::base("RESTART", name);
            result.success = true;
            result.is_recovered = Some(true);
            result.total_attempts = Some(attempt);
            result.attempts = attempts;
            return result;
        }

        // every retry failed: isolate the container
        warn!(container = name, max_retries, "restart retries exhausted, stopping container");
        let stop_result = self.execute_stop(name).await;

        let mut result = ActionResult::base("RESTART", name);
        result.success = false;
        result.is_recovered = Some(false);
        result.total_attempts = Some(max_retries);
        result.attempts = attempts;
        result.final_action = Some("STOP".to_string());
        result.stop_result = Some(Box::new(stop_result));
        result.reason = Some(format!(
            "container did not recover after {max_retries} restarts; stopped"
        ));
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::tests::{calm_stats, config_with, quick_policy, stopped_container};
    use super::super::Executor;
    use crate::client::fake::FakeRuntime;
    use crate::client::runtime::ContainerRuntime;
    use crate::conf::model::ContainerConfig;
    use crate::docker::inventory::ContainerStats;

    fn watched(name: &str, max_retries: usize) -> ContainerConfig {
        ContainerConfig {
            name: name.to_string(),
            enabled: true,
            policy: quick_policy(max_retries),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_verified_attempt_recovers() {
        let runtime = Arc::new(FakeRuntime::new());
        runtime.put_container(stopped_container("web"));
        runtime.put_stats("web", calm_stats());

        let executor = Executor::new(
            Arc::clone(&runtime) as Arc<dyn ContainerRuntime>,
            config_with(&["RESTART"], vec![watched("web", 3)]),
        );

        let result = executor.execute("RESTART", "web").await;
        assert!(result.success);
        assert_eq!(result.is_recovered, Some(true));
        assert_eq!(result.total_attempts, Some(1));
        assert_eq!(runtime.call_count("restart"), 1);
        assert_eq!(runtime.call_count("stop"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn all_failures_end_in_exactly_one_stop() {
        let runtime = Arc::new(FakeRuntime::new());
        runtime.put_container(stopped_container("crash"));
        // restarts "succeed" at the CLI level but the container never
        // comes back up
        runtime.restart_leaves_state();

        let executor = Executor::new(
            Arc::clone(&runtime) as Arc<dyn ContainerRuntime>,
            config_with(&["RESTART", "STOP"], vec![watched("crash", 3)]),
        );

        let result = executor.execute("RESTART", "crash").await;
        assert!(!result.success);
        assert_eq!(result.is_recovered, Some(false));
        assert_eq!(result.total_attempts, Some(3));
        assert_eq!(result.final_action.as_deref(), Some("STOP"));
        assert_eq!(result.attempts.len(), 3);
        assert!(result.stop_result.is_some());

        // the runtime saw exactly max_retries restarts then one stop
        assert_eq!(runtime.call_count("restart"), 3);
        assert_eq!(runtime.call_count("stop"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hot_cpu_after_restart_sets_flag_two() {
        let runtime = Arc::new(FakeRuntime::new());
        runtime.put_container(stopped_container("hot"));
        runtime.put_stats(
            "hot",
            ContainerStats {
                cpu_percent: "88.0%".to_string(),
                memory_percent: "30.0%".to_string(),
                ..Default::default()
            },
        );

        let executor = Executor::new(
            Arc::clone(&runtime) as Arc<dyn ContainerRuntime>,
            config_with(&["RESTART", "STOP"], vec![watched("hot", 1)]),
        );

        let result = executor.execute("RESTART", "hot").await;
        assert!(!result.success);
        assert_eq!(result.attempts[0].failure_flag, Some(2));
        assert!(result.attempts[0].reason.as_ref().unwrap().contains("CPU"));
    }

    #[tokio::test(start_paused = true)]
    async fn high_memory_after_restart_sets_flag_three() {
        let runtime = Arc::new(FakeRuntime::new());
        runtime.put_container(stopped_container("leaky"));
        runtime.put_stats(
            "leaky",
            ContainerStats {
                cpu_percent: "5.0%".to_string(),
                memory_percent: "91.0%".to_string(),
                ..Default::default()
            },
        );

        let executor = Executor::new(
            Arc::clone(&runtime) as Arc<dyn ContainerRuntime>,
            config_with(&["RESTART", "STOP"], vec![watched("leaky", 1)]),
        );

        let result = executor.execute("RESTART", "leaky").await;
        assert!(!result.success);
        assert_eq!(result.attempts[0].failure_flag, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_restart_command_is_recorded_per_attempt() {
        let runtime = Arc::new(FakeRuntime::new());
        runtime.put_container(stopped_container("web"));
        runtime.fail_restart();

        let executor = Executor::new(
            Arc::clone(&runtime) as Arc<dyn ContainerRuntime>,
            config_with(&["RESTART", "STOP"], vec![watched("web", 2)]),
        );

        let result = executor.execute("RESTART", "web").await;
        assert!(!result.success);
        assert_eq!(result.attempts.len(), 2);
        assert!(!result.attempts[0].restart_success);
        assert!(result.attempts[0].reason.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_stats_fails_the_attempt() {
        let runtime = Arc::new(FakeRuntime::new());
        runtime.put_container(stopped_container("blind"));
        // no stats seeded

        let executor = Executor::new(
            Arc::clone(&runtime) as Arc<dyn ContainerRuntime>,
            config_with(&["RESTART", "STOP"], vec![watched("blind", 1)]),
        );

        let result = executor.execute("RESTART", "blind").await;
        assert!(!result.success);
        assert!(result.attempts[0]
            .reason
            .as_ref()
            .unwrap()
            .contains("stats unavailable"));
    }
}
