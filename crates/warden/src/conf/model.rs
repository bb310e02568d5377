//! Model — WardenConfig and related structs.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    pub system: SystemConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub llm: LlmConfig,
    pub thresholds: ThresholdConfig,
    pub notification: NotificationConfig,
    pub executor: ExecutorConfig,
    /// Watched containers, merged in from the watchlist file. Disabled
    /// entries are filtered out at load time.
    #[serde(skip)]
    pub containers: Vec<ContainerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub check_interval_seconds: u64,
    pub resource_check_interval_seconds: u64,
    pub evidence_log_lines: usize,
    pub log_level: String,
    pub log_file: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            check_interval_seconds: 30,
            resource_check_interval_seconds: 120,
            evidence_log_lines: 50,
            log_level: "info".to_string(),
            log_file: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    pub max_restart_attempts: usize,
    pub window_seconds: u64,
    /// Doubles as the dedup quiet period between accepted reports for the
    /// same container. One knob on purpose.
    pub cooldown_seconds: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            max_restart_attempts: 3,
            window_seconds: 300,
            cooldown_seconds: 1800,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    /// May be written as `${ENV_VAR}` in the config file.
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub timeout_seconds: u64,
    pub max_retries: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "deepseek".to_string(),
            api_key: String::new(),
            base_url: "https://api.deepseek.com".to_string(),
            model: "deepseek-chat".to_string(),
            temperature: 0.0,
            timeout_seconds: 30,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub cpu_warning: f64,
    pub cpu_critical: f64,
    pub memory_warning: f64,
    pub memory_critical: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            cpu_warning: 70.0,
            cpu_critical: 90.0,
            memory_warning: 70.0,
            memory_critical: 85.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub enabled: bool,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub use_ssl: bool,
    pub sender: String,
    pub password: String,
    pub recipients: Vec<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_server: String::new(),
            smtp_port: 465,
            use_ssl: true,
            sender: String::new(),
            password: String::new(),
            recipients: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub host: String,
    pub port: u16,
    /// Closed whitelist; anything else is rejected before touching the
    /// runtime.
    pub allowed_actions: Vec<String>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9999,
            allowed_actions: vec![
                "RESTART".to_string(),
                "STOP".to_string(),
                "INSPECT".to_string(),
            ],
        }
    }
}

// ── Watchlist ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    pub name: String,
    pub enabled: bool,
    pub description: String,
    pub health_check: Option<HealthCheckConfig>,
    pub thresholds: Option<ContainerThresholds>,
    pub policy: Option<RestartPolicy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// "http", "tcp", or "command".
    #[serde(rename = "type")]
    pub kind: String,
    pub endpoint: String,
    pub host: String,
    pub port: u16,
    pub command: String,
    pub expected_status: u16,
    pub expected_output: String,
    pub timeout_seconds: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            kind: String::new(),
            endpoint: String::new(),
            host: "localhost".to_string(),
            port: 80,
            command: String::new(),
            expected_status: 200,
            expected_output: String::new(),
            timeout_seconds: 5,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerThresholds {
    pub cpu_percent_critical: Option<f64>,
    pub memory_percent_critical: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RestartPolicy {
    pub max_retries: Option<usize>,
    pub restart_delay_seconds: Option<u64>,
}

impl WardenConfig {
    /// Look up the watchlist entry for a container.
    pub fn container(&self, name: &str) -> Option<&ContainerConfig> {
        self.containers.iter().find(|c| c.name == name)
    }

    /// Effective critical CPU threshold for a container.
    pub fn cpu_critical_for(&self, name: &str) -> f64 {
        self.container(name)
            .and_then(|c| c.thresholds.as_ref())
            .and_then(|t| t.cpu_percent_critical)
            .unwrap_or(self.thresholds.cpu_critical)
    }

    /// Effective critical memory threshold for a container.
    pub fn memory_critical_for(&self, name: &str) -> f64 {
        self.container(name)
            .and_then(|c| c.thresholds.as_ref())
            .and_then(|t| t.memory_percent_critical)
            .unwrap_or(self.thresholds.memory_critical)
    }
}
