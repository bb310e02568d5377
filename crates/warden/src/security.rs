//! Security probes — attack signatures in logs, blacklisted processes.
//!
//! Rule lists come from `security_rules.yml` in the config directory and
//! are loaded once at startup. An unreadable or empty rule file falls
//! back to the built-in defaults so the probes never run blind.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::client::runtime::ContainerRuntime;

const DEFAULT_LOG_PATTERNS: &[&str] = &[
    "UNION SELECT",
    "syntax error",
    "ORA-",
    "MySQL Error",
    "/etc/passwd",
    "cat /flag",
    "whoami",
    "<script>",
    "alert(1)",
];

const DEFAULT_PROCESS_BLACKLIST: &[&str] = &[
    "xmrig", "minerd", "nmap", "sqlmap", "hydra", "nc -e", "bash -i",
];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RulesFile {
    /// Category name → substring patterns. Categories exist only for the
    /// rule file's readability; matching flattens them.
    log_patterns: BTreeMap<String, Vec<String>>,
    process_blacklist: Vec<String>,
}

/// Flattened, ready-to-match rule lists.
#[derive(Debug, Clone)]
pub struct SecurityRules {
    log_patterns: Vec<String>,
    process_blacklist: Vec<String>,
}

impl SecurityRules {
    /// Load from `<dir>/security_rules.yml`, defaulting each list
    /// independently when missing or empty.
    pub fn load(dir: &Path) -> Self {
        let path = dir.join("security_rules.yml");
        let parsed = std::fs::read_to_string(&path)
            .ok()
            .and_then(|contents| serde_yaml::from_str::<RulesFile>(&contents).ok())
            .unwrap_or_default();

        let log_patterns: Vec<String> = parsed.log_patterns.into_values().flatten().collect();
        let log_patterns = if log_patterns.is_empty() {
            tracing::debug!("no log patterns configured, using built-in defaults");
            DEFAULT_LOG_PATTERNS.iter().map(|s| s.to_string()).collect()
        } else {
            log_patterns
        };

        let process_blacklist = if parsed.process_blacklist.is_empty() {
            DEFAULT_PROCESS_BLACKLIST
                .iter()
                .map(|s| s.to_string())
                .collect()
        } else {
            parsed.process_blacklist
        };

        Self {
            log_patterns,
            process_blacklist,
        }
    }

    pub fn defaults() -> Self {
        Self {
            log_patterns: DEFAULT_LOG_PATTERNS.iter().map(|s| s.to_string()).collect(),
            process_blacklist: DEFAULT_PROCESS_BLACKLIST
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Attack signatures present in a log excerpt. Plain substring match.
    pub fn logs_matching(&self, logs: &str) -> Vec<String> {
        self.log_patterns
            .iter()
            .filter(|p| logs.contains(p.as_str()))
            .cloned()
            .collect()
    }

    /// Blacklisted process names present in a process-table dump.
    pub fn processes_matching(&self, top_output: &str) -> Vec<String> {
        let mut found = Vec::new();
        for line in top_output.lines() {
            for bad in &self.process_blacklist {
                if line.contains(bad.as_str()) && !found.contains(bad) {
                    found.push(bad.clone());
                }
            }
        }
        found
    }
}

/// Probes bound to a runtime, used by the monitor and the collector.
pub struct SecurityProbes {
    rules: SecurityRules,
    runtime: Arc<dyn ContainerRuntime>,
}

impl SecurityProbes {
    pub fn new(rules: SecurityRules, runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { rules, runtime }
    }

    pub fn check_logs_for_injection(&self, logs: &str) -> Vec<String> {
        self.rules.logs_matching(logs)
    }

    /// Fetch the container's process table and match it against the
    /// blacklist. A container we cannot `top` reports nothing.
    pub async fn check_processes(&self, name: &str) -> Vec<String> {
        match self.runtime.top(name).await {
            Ok(top) => self.rules.processes_matching(&top),
            Err(e) => {
                tracing::debug!("process check skipped for {name}: {e}");
                Vec::new()
            }
        }
    }
}
