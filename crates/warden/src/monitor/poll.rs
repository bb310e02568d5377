//! Poll loop — periodic liveness, resource, trend, and security checks.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::conf::model::ContainerConfig;
use crate::docker::inventory::{parse_memory_mb, parse_percent};
use crate::evidence::model::FaultKind;

use super::trend::TrendTracker;
use super::Monitor;

/// Log lines fetched for the security sweep each resource tick.
const SECURITY_LOG_LINES: usize = 100;

impl Monitor {
    /// Tick at `check_interval_seconds`. Liveness runs every tick;
    /// resources every `resource_check_interval / check_interval` ticks.
    pub(super) async fn poll_loop(&self) {
        let interval =
            std::time::Duration::from_secs(self.config.system.check_interval_seconds);
        let resource_every = (self.config.system.resource_check_interval_seconds
            / self.config.system.check_interval_seconds)
            .max(1);
        let mut tick: u64 = 0;

        loop {
            if self.stop.is_cancelled() {
                break;
            }
            tick += 1;

            self.liveness_pass().await;
            if tick % resource_every == 0 {
                self.resources_pass().await;
            }

            tokio::select! {
                _ = self.stop.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
        debug!("poll loop stopped");
    }

    pub(crate) async fn liveness_pass(&self) {
        for container in self.config.containers.clone() {
            self.check_liveness(&container).await;
        }
    }

    pub(crate) async fn resources_pass(&self) {
        for container in self.config.containers.clone() {
            self.check_resources(&container, Utc::now()).await;
        }
    }

    /// Liveness: exists, running, and (when configured) healthy.
    /// Returns the faults that were actually admitted by the governor.
    pub(crate) async fn check_liveness(&self, container: &ContainerConfig) -> Vec<FaultKind> {
        let name = container.name.as_str();
        let mut reported = Vec::new();

        let info = match self.runtime.inspect(name).await {
            Ok(info) => info,
            Err(e) => {
                self.log_pass_error("liveness check", name, e);
                return reported;
            }
        };

        let Some(info) = info else {
            warn!(container = name, "watched container does not exist");
            if self.report_issue(name, FaultKind::ProcessCrash).await {
                reported.push(FaultKind::ProcessCrash);
            }
            return reported;
        };

        if !info.running {
            warn!(container = name, status = %info.status, "watched container is not running");
            if self.report_issue(name, FaultKind::ProcessCrash).await {
                reported.push(FaultKind::ProcessCrash);
            }
            return reported;
        }

        if let Some(health_config) = &container.health_check {
            let health = self.health.check(name, health_config).await;
            if !health.healthy {
                warn!(container = name, message = %health.message, "health check failed");
                if self.report_issue(name, FaultKind::HealthFail).await {
                    reported.push(FaultKind::HealthFail);
                }
            }
        }

        reported
    }

    /// Resources: stats, memory trend, security sweep, threshold
    /// comparison. A container with no stats this tick is skipped, not
    /// reported.
    pub(crate) async fn check_resources(
        &self,
        container: &ContainerConfig,
        now: DateTime<Utc>,
    ) -> Vec<FaultKind> {
        let name = container.name.as_str();
        let mut reported = Vec::new();

        let stats = match self.runtime.stats(name).await {
            Ok(Some(stats)) => stats,
            Ok(None) => {
                warn!(container = name, "stats unavailable, skipping this tick");
                return reported;
            }
            Err(e) => {
                self.log_pass_error("resource check", name, e);
                return reported;
            }
        };

        let cpu_percent = parse_percent(&stats.cpu_percent);
        let memory_percent = parse_percent(&stats.memory_percent);
        let memory_mb = parse_memory_mb(&stats.memory_usage);

        // memory growth trend
        let slope = {
            let mut trend = match self.trend.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            trend.record(name, now, memory_mb)
        };
        if let Some(slope) = slope {
            if TrendTracker::leak_suspected(slope, memory_percent) {
                warn!(
                    container = name,
                    slope_mb_per_min = format!("{slope:.2}"),
                    memory_percent,
                    "memory leak trend detected"
                );
                if self.report_issue(name, FaultKind::MemoryLeakSuspected).await {
                    reported.push(FaultKind::MemoryLeakSuspected);
                }
            }
        }

        // security sweep
        let logs = self.runtime.logs(name, SECURITY_LOG_LINES).await;
        let log_hits = self.probes.check_logs_for_injection(&logs);
        if !log_hits.is_empty() {
            warn!(container = name, patterns = ?log_hits, "attack signatures in logs");
            if self.report_issue(name, FaultKind::SecurityLogAlert).await {
                reported.push(FaultKind::SecurityLogAlert);
            }
        }
        let proc_hits = self.probes.check_processes(name).await;
        if !proc_hits.is_empty() {
            warn!(container = name, processes = ?proc_hits, "blacklisted processes running");
            if self.report_issue(name, FaultKind::MaliciousProcess).await {
                reported.push(FaultKind::MaliciousProcess);
            }
        }

        // critical thresholds, per-container overrides first
        let cpu_critical = self.config.cpu_critical_for(name);
        let memory_critical = self.config.memory_critical_for(name);

        if cpu_percent >= cpu_critical {
            warn!(container = name, cpu_percent, cpu_critical, "CPU above critical threshold");
            if self.report_issue(name, FaultKind::CpuHigh).await {
                reported.push(FaultKind::CpuHigh);
            }
        }
        if memory_percent >= memory_critical {
            warn!(container = name, memory_percent, memory_critical, "memory above critical threshold");
            if self.report_issue(name, FaultKind::MemoryHigh).await {
                reported.push(FaultKind::MemoryHigh);
            }
        }

        reported
    }
}
