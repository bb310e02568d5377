//! Evidence model — the canonical observation bundle fed to diagnosis.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::conf::model::ThresholdConfig;
use crate::docker::inventory::ContainerInfo;

/// Closed set of anomaly labels. Detectors attach one as a hint; the
/// diagnosis step may re-label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FaultKind {
    CpuHigh,
    MemoryHigh,
    ProcessCrash,
    OomKilled,
    HealthFail,
    MemoryLeakSuspected,
    AttackAttempt,
    SecurityIncident,
    SecurityLogAlert,
    MaliciousProcess,
    SystemError,
    NoError,
    Unknown,
}

impl FaultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultKind::CpuHigh => "CPU_HIGH",
            FaultKind::MemoryHigh => "MEMORY_HIGH",
            FaultKind::ProcessCrash => "PROCESS_CRASH",
            FaultKind::OomKilled => "OOM_KILLED",
            FaultKind::HealthFail => "HEALTH_FAIL",
            FaultKind::MemoryLeakSuspected => "MEMORY_LEAK_SUSPECTED",
            FaultKind::AttackAttempt => "ATTACK_ATTEMPT",
            FaultKind::SecurityIncident => "SECURITY_INCIDENT",
            FaultKind::SecurityLogAlert => "SECURITY_LOG_ALERT",
            FaultKind::MaliciousProcess => "MALICIOUS_PROCESS",
            FaultKind::SystemError => "SYSTEM_ERROR",
            FaultKind::NoError => "NO_ERROR",
            FaultKind::Unknown => "UNKNOWN",
        }
    }

    /// Parse a label, mapping anything unrecognized to `Unknown`.
    pub fn parse(label: &str) -> Self {
        serde_json::from_value(serde_json::Value::String(label.to_string()))
            .unwrap_or(FaultKind::Unknown)
    }
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health check verdict carried in evidence and restart verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub message: String,
}

impl HealthStatus {
    pub fn healthy(message: impl Into<String>) -> Self {
        Self {
            healthy: true,
            message: message.into(),
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            healthy: false,
            message: message.into(),
        }
    }
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self::healthy("")
    }
}

/// The observation payload inside an [`Evidence`] bundle.
#[derive(Debug, Clone, Serialize)]
pub struct EvidenceDetail {
    pub exit_code: i64,
    pub oom_killed: bool,
    pub error_message: String,
    pub cpu_percent: String,
    pub memory_percent: String,
    pub memory_usage: String,
    pub logs_tail: String,
    pub security_issues: Vec<String>,
    /// Remote IP → count of ESTABLISHED connections.
    pub active_connections: BTreeMap<String, u32>,
    pub restart_count_24h: i64,
    pub health_check: HealthStatus,
}

/// Threshold snapshot baked into each bundle so the diagnoser sees the
/// limits that were in force when the anomaly fired.
#[derive(Debug, Clone, Serialize)]
pub struct ThresholdSnapshot {
    pub cpu_warning: f64,
    pub cpu_critical: f64,
    pub memory_warning: f64,
    pub memory_critical: f64,
}

impl From<&ThresholdConfig> for ThresholdSnapshot {
    fn from(t: &ThresholdConfig) -> Self {
        Self {
            cpu_warning: t.cpu_warning,
            cpu_critical: t.cpu_critical,
            memory_warning: t.memory_warning,
            memory_critical: t.memory_critical,
        }
    }
}

/// Immutable observation bundle for one anomaly. Built once by the
/// collector, passed by value through the diagnosis graph.
#[derive(Debug, Clone, Serialize)]
pub struct Evidence {
    /// Correlation key, monotonic per second (`evt_YYYYMMDD_HHMMSS`).
    pub event_id: String,
    pub timestamp: String,
    pub container: ContainerInfo,
    pub evidence: EvidenceDetail,
    pub fault_type: FaultKind,
    pub thresholds: ThresholdSnapshot,
}

impl Evidence {
    pub fn container_name(&self) -> &str {
        &self.container.name
    }
}
