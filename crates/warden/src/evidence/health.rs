//! Health checks — http, tcp, and in-container command probes.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;

use crate::client::runtime::ContainerRuntime;
use crate::conf::model::HealthCheckConfig;

use super::model::HealthStatus;

pub struct HealthChecker {
    runtime: Arc<dyn ContainerRuntime>,
}

impl HealthChecker {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { runtime }
    }

    /// Run the configured health check against a container. A missing or
    /// unrecognized check kind counts as healthy — absence of a probe is
    /// not a fault.
    pub async fn check(&self, name: &str, config: &HealthCheckConfig) -> HealthStatus {
        let timeout = Duration::from_secs(config.timeout_seconds.max(1));
        match config.kind.as_str() {
            "http" => self.check_http(config, timeout).await,
            "tcp" => self.check_tcp(config, timeout).await,
            "command" => self.check_command(name, config, timeout).await,
            _ => HealthStatus::healthy("no health check configured"),
        }
    }

    async fn check_http(&self, config: &HealthCheckConfig, timeout: Duration) -> HealthStatus {
        let client = match reqwest::Client::builder().timeout(timeout).build() {
            Ok(client) => client,
            Err(e) => return HealthStatus::unhealthy(format!("http client init failed: {e}")),
        };

        match client.get(&config.endpoint).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                if status == config.expected_status {
                    HealthStatus::healthy(format!("HTTP {status}"))
                } else {
                    HealthStatus::unhealthy(format!(
                        "HTTP {status}, expected {}",
                        config.expected_status
                    ))
                }
            }
            Err(e) => HealthStatus::unhealthy(format!("connection failed: {e}")),
        }
    }

    async fn check_tcp(&self, config: &HealthCheckConfig, timeout: Duration) -> HealthStatus {
        let addr = format!("{}:{}", config.host, config.port);
        match tokio::time::timeout(timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(_)) => HealthStatus::healthy(format!("TCP {addr} reachable")),
            Ok(Err(e)) => HealthStatus::unhealthy(format!("TCP {addr} unreachable: {e}")),
            Err(_) => HealthStatus::unhealthy(format!("TCP {addr} timed out")),
        }
    }

    async fn check_command(
        &self,
        name: &str,
        config: &HealthCheckConfig,
        timeout: Duration,
    ) -> HealthStatus {
        let argv: Vec<String> = config
            .command
            .split_whitespace()
            .map(|s| s.to_string())
            .collect();
        if argv.is_empty() {
            return HealthStatus::unhealthy("empty health check command");
        }

        match self.runtime.exec(name, &argv, timeout).await {
            Ok(out) if out.ok() && out.stdout.contains(&config.expected_output) => {
                let message = crate::docker::inventory::truncate_bytes(&out.stdout, 100);
                HealthStatus::healthy(message)
            }
            Ok(out) => HealthStatus::unhealthy(format!(
                "command returned: {}",
                if out.stdout.is_empty() { out.stderr } else { out.stdout }
            )),
            Err(e) => HealthStatus::unhealthy(format!("exec failed: {e}")),
        }
    }
}
