//! Collector — assembles the evidence bundle for one anomaly.

use std::sync::Arc;

use chrono::Utc;

use crate::client::runtime::ContainerRuntime;
use crate::conf::WardenConfig;
use crate::docker::inventory::{ContainerInfo, ContainerStats};
use crate::security::SecurityProbes;

use super::health::HealthChecker;
use super::model::{Evidence, EvidenceDetail, FaultKind, HealthStatus, ThresholdSnapshot};
use super::network;

/// Prefix the rule pre-check keys on. Kept in one place so the collector
/// and the diagnoser cannot drift apart.
pub const MALICIOUS_PROCESS_MARKER: &str = "malicious process detected";
pub const LOG_PATTERN_MARKER: &str = "suspicious log patterns detected";

pub struct Collector {
    runtime: Arc<dyn ContainerRuntime>,
    probes: Arc<SecurityProbes>,
    health: HealthChecker,
    config: Arc<WardenConfig>,
}

impl Collector {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        probes: Arc<SecurityProbes>,
        config: Arc<WardenConfig>,
    ) -> Self {
        let health = HealthChecker::new(Arc::clone(&runtime));
        Self {
            runtime,
            probes,
            health,
            config,
        }
    }

    /// Build the bundle for `name`. Every sub-probe is tolerant of
    /// failure; the collector itself never fails and always returns a
    /// bundle whose container name matches the request.
    pub async fn collect(&self, name: &str, fault_hint: FaultKind) -> Evidence {
        let info = self
            .runtime
            .inspect(name)
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| ContainerInfo::unknown(name));

        let stats = self
            .runtime
            .stats(name)
            .await
            .ok()
            .flatten()
            .unwrap_or_else(ContainerStats::default);

        let logs = self
            .runtime
            .logs(name, self.config.system.evidence_log_lines)
            .await;

        let mut security_issues = Vec::new();
        let log_hits = self.probes.check_logs_for_injection(&logs);
        if !log_hits.is_empty() {
            security_issues.push(format!("{LOG_PATTERN_MARKER}: {log_hits:?}"));
        }
        let proc_hits = self.probes.check_processes(name).await;
        if !proc_hits.is_empty() {
            security_issues.push(format!("{MALICIOUS_PROCESS_MARKER}: {proc_hits:?}"));
        }

        let active_connections = network::active_connections(self.runtime.as_ref(), name).await;

        let health_check = match self
            .config
            .container(name)
            .and_then(|c| c.health_check.as_ref())
        {
            Some(health_config) => self.health.check(name, health_config).await,
            None => HealthStatus::default(),
        };

        let now = Utc::now();
        Evidence {
            event_id: format!("evt_{}", now.format("%Y%m%d_%H%M%S")),
            timestamp: now.to_rfc3339(),
            evidence: EvidenceDetail {
                exit_code: info.exit_code,
                oom_killed: info.oom_killed,
                error_message: info.error.clone(),
                cpu_percent: stats.cpu_percent.clone(),
                memory_percent: stats.memory_percent.clone(),
                memory_usage: stats.memory_usage.clone(),
                logs_tail: logs,
                security_issues,
                active_connections,
                restart_count_24h: info.restart_count,
                health_check,
            },
            container: info,
            fault_type: fault_hint,
            thresholds: ThresholdSnapshot::from(&self.config.thresholds),
        }
    }
}
