//! Parsed records of `docker inspect` / `docker stats` output, plus the
//! string parsers for the CLI's human-formatted percent and memory fields.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Container state snapshot derived from `docker inspect --format '{{json .}}'`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub id: String, // first 12 chars of the full hash
    pub name: String,
    pub image: String,
    pub status: String, // "running", "exited", ...
    pub running: bool,
    pub restarting: bool,
    pub paused: bool,
    pub oom_killed: bool,
    pub exit_code: i64,
    pub error: String, // daemon-side error reason (e.g. port conflict)
    pub started_at: String,
    pub finished_at: String,
    pub restart_count: i64,
    pub restart_policy: String,
    pub memory_limit: i64,
    pub cpu_limit: i64,
    pub ip_address: String,
    pub ports: serde_json::Value,
}

/// One-shot resource usage from `docker stats --no-stream`.
///
/// Percentages stay as the raw CLI strings ("12.3%"); callers that need
/// numbers go through [`parse_percent`] / [`parse_memory_mb`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerStats {
    pub cpu_percent: String,
    pub memory_percent: String,
    pub memory_usage: String, // "100MiB / 1GiB"
    pub net_io: String,
    pub block_io: String,
}

impl Default for ContainerStats {
    fn default() -> Self {
        Self {
            cpu_percent: "0%".to_string(),
            memory_percent: "0%".to_string(),
            memory_usage: String::new(),
            net_io: String::new(),
            block_io: String::new(),
        }
    }
}

// ── Raw serde mirrors of the CLI JSON ───────────────────────────

#[derive(Debug, Default, Deserialize)]
struct RawInspect {
    #[serde(rename = "Id", default)]
    id: String,
    #[serde(rename = "State", default)]
    state: RawState,
    #[serde(rename = "Config", default)]
    config: RawConfig,
    #[serde(rename = "HostConfig", default)]
    host_config: RawHostConfig,
    #[serde(rename = "NetworkSettings", default)]
    network: RawNetwork,
    #[serde(rename = "RestartCount", default)]
    restart_count: i64,
}

#[derive(Debug, Default, Deserialize)]
struct RawState {
    #[serde(rename = "Status", default)]
    status: String,
    #[serde(rename = "Running", default)]
    running: bool,
    #[serde(rename = "Restarting", default)]
    restarting: bool,
    #[serde(rename = "Paused", default)]
    paused: bool,
    #[serde(rename = "OOMKilled", default)]
    oom_killed: bool,
    #[serde(rename = "ExitCode", default)]
    exit_code: i64,
    #[serde(rename = "Error", default)]
    error: String,
    #[serde(rename = "StartedAt", default)]
    started_at: String,
    #[serde(rename = "FinishedAt", default)]
    finished_at: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(rename = "Image", default)]
    image: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawHostConfig {
    #[serde(rename = "RestartPolicy", default)]
    restart_policy: RawRestartPolicy,
    #[serde(rename = "Memory", default)]
    memory: i64,
    #[serde(rename = "NanoCpus", default)]
    nano_cpus: i64,
}

#[derive(Debug, Default, Deserialize)]
struct RawRestartPolicy {
    #[serde(rename = "Name", default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawNetwork {
    #[serde(rename = "IPAddress", default)]
    ip_address: String,
    #[serde(rename = "Ports", default)]
    ports: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RawStats {
    #[serde(rename = "CPUPerc", default)]
    cpu_perc: String,
    #[serde(rename = "MemUsage", default)]
    mem_usage: String,
    #[serde(rename = "MemPerc", default)]
    mem_perc: String,
    #[serde(rename = "NetIO", default)]
    net_io: String,
    #[serde(rename = "BlockIO", default)]
    block_io: String,
}

impl ContainerInfo {
    /// Parse one `docker inspect --format '{{json .}}'` record.
    ///
    /// Any field the daemon omits falls back to its zero value; a record
    /// that is not JSON at all yields `None`.
    pub fn from_inspect_json(name: &str, raw: &str) -> Option<Self> {
        let parsed: RawInspect = serde_json::from_str(raw).ok()?;
        let ports = if parsed.network.ports.is_null() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            parsed.network.ports
        };
        Some(Self {
            id: parsed.id.chars().take(12).collect(),
            name: name.to_string(),
            image: parsed.config.image,
            status: parsed.state.status,
            running: parsed.state.running,
            restarting: parsed.state.restarting,
            paused: parsed.state.paused,
            oom_killed: parsed.state.oom_killed,
            exit_code: parsed.state.exit_code,
            error: parsed.state.error,
            started_at: parsed.state.started_at,
            finished_at: parsed.state.finished_at,
            restart_count: parsed.restart_count,
            restart_policy: parsed.host_config.restart_policy.name,
            memory_limit: parsed.host_config.memory,
            cpu_limit: parsed.host_config.nano_cpus,
            ip_address: parsed.network.ip_address,
            ports,
        })
    }

    /// Placeholder record for a container the daemon does not know about.
    pub fn unknown(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: "unknown".to_string(),
            ports: serde_json::Value::Object(serde_json::Map::new()),
            ..Default::default()
        }
    }
}

impl ContainerStats {
    /// Parse one `docker stats --no-stream --format '{{json .}}'` record.
    pub fn from_stats_json(raw: &str) -> Option<Self> {
        let parsed: RawStats = serde_json::from_str(raw).ok()?;
        Some(Self {
            cpu_percent: if parsed.cpu_perc.is_empty() { "0%".into() } else { parsed.cpu_perc },
            memory_percent: if parsed.mem_perc.is_empty() { "0%".into() } else { parsed.mem_perc },
            memory_usage: parsed.mem_usage,
            net_io: parsed.net_io,
            block_io: parsed.block_io,
        })
    }
}

// ── String parsers ──────────────────────────────────────────────

/// Parse a CLI percentage string ("12.3%", " 85 % ") into a float.
/// Anything unparsable is 0.0 — a missing number must never distort a
/// threshold comparison upward.
pub fn parse_percent(value: &str) -> f64 {
    value
        .replace('%', "")
        .trim()
        .parse::<f64>()
        .unwrap_or(0.0)
}

/// Parse the "used" half of a `docker stats` memory column into megabytes.
///
/// Accepts "100MiB / 1GiB" or a bare "500MB". Binary units (KiB/MiB/GiB)
/// convert at 1024, decimal units (KB/MB/GB) at 1000, and a bare `B`
/// suffix is bytes. Unparsable input is 0.0.
pub fn parse_memory_mb(mem: &str) -> f64 {
    let used = match mem.split('/').next() {
        Some(part) => part.trim(),
        None => return 0.0,
    };

    let strip = |suffix: &str| -> Option<f64> {
        used.strip_suffix(suffix)
            .and_then(|n| n.trim().parse::<f64>().ok())
    };

    if let Some(n) = strip("GiB") {
        n * 1024.0
    } else if let Some(n) = strip("MiB") {
        n
    } else if let Some(n) = strip("KiB") {
        n / 1024.0
    } else if let Some(n) = strip("GB") {
        n * 1000.0
    } else if let Some(n) = strip("MB") {
        n
    } else if let Some(n) = strip("KB") {
        n / 1000.0
    } else if let Some(n) = strip("B") {
        n / 1024.0 / 1024.0
    } else {
        used.parse::<f64>().unwrap_or(0.0)
    }
}

/// Truncate a string to at most `max_bytes`, backing up to a char boundary.
pub fn truncate_bytes(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// A single record from the engine event stream (die / oom, filtered to
/// containers).
#[derive(Debug, Clone)]
pub struct ContainerEvent {
    pub action: String,
    pub attributes: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "Action", default)]
    action: String,
    #[serde(rename = "Actor", default)]
    actor: RawActor,
}

#[derive(Debug, Default, Deserialize)]
struct RawActor {
    #[serde(rename = "Attributes", default)]
    attributes: HashMap<String, String>,
}

impl ContainerEvent {
    /// Parse one line of `docker events --format '{{json .}}'`.
    pub fn from_json_line(line: &str) -> Option<Self> {
        let parsed: RawEvent = serde_json::from_str(line.trim()).ok()?;
        Some(Self {
            action: parsed.action,
            attributes: parsed.actor.attributes,
        })
    }

    pub fn container_name(&self) -> Option<&str> {
        self.attributes.get("name").map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSPECT_JSON: &str = r#"{
        "Id": "abcdef0123456789abcdef0123456789abcdef0123456789abcdef0123456789",
        "State": {
            "Status": "running",
            "Running": true,
            "Restarting": false,
            "Paused": false,
            "OOMKilled": false,
            "ExitCode": 0,
            "Error": "",
            "StartedAt": "2025-01-01T10:00:00Z",
            "FinishedAt": "0001-01-01T00:00:00Z"
        },
        "RestartCount": 2,
        "Config": {"Image": "nginx:latest"},
        "HostConfig": {
            "RestartPolicy": {"Name": "always"},
            "Memory": 536870912,
            "NanoCpus": 1000000000
        },
        "NetworkSettings": {
            "IPAddress": "172.17.0.2",
            "Ports": {"80/tcp": null}
        }
    }"#;

    #[test]
    fn inspect_parses_full_record() {
        let info = ContainerInfo::from_inspect_json("web", INSPECT_JSON).unwrap();
        assert_eq!(info.id, "abcdef012345");
        assert_eq!(info.name, "web");
        assert_eq!(info.image, "nginx:latest");
        assert!(info.running);
        assert!(!info.oom_killed);
        assert_eq!(info.exit_code, 0);
        assert_eq!(info.restart_count, 2);
        assert_eq!(info.restart_policy, "always");
        assert_eq!(info.memory_limit, 536_870_912);
        assert_eq!(info.ip_address, "172.17.0.2");
    }

    #[test]
    fn inspect_tolerates_missing_sections() {
        let info = ContainerInfo::from_inspect_json("bare", r#"{"Id": "0123456789ab"}"#).unwrap();
        assert_eq!(info.name, "bare");
        assert!(!info.running);
        assert_eq!(info.restart_policy, "");
        assert!(info.ports.is_object());
    }

    #[test]
    fn inspect_rejects_non_json() {
        assert!(ContainerInfo::from_inspect_json("x", "Error: no such container").is_none());
    }

    #[test]
    fn stats_parses_record() {
        let raw = r#"{"CPUPerc":"12.5%","MemUsage":"100MiB / 1GiB","MemPerc":"9.8%","NetIO":"1kB / 2kB","BlockIO":"0B / 0B"}"#;
        let stats = ContainerStats::from_stats_json(raw).unwrap();
        assert_eq!(stats.cpu_percent, "12.5%");
        assert_eq!(stats.memory_percent, "9.8%");
        assert_eq!(stats.memory_usage, "100MiB / 1GiB");
    }

    #[test]
    fn stats_defaults_empty_percentages() {
        let stats = ContainerStats::from_stats_json("{}").unwrap();
        assert_eq!(stats.cpu_percent, "0%");
        assert_eq!(stats.memory_percent, "0%");
    }

    #[test]
    fn percent_parses_plain_and_padded() {
        assert_eq!(parse_percent("85.5%"), 85.5);
        assert_eq!(parse_percent(" 70 % "), 70.0);
        assert_eq!(parse_percent("0.00%"), 0.0);
    }

    #[test]
    fn percent_invalid_is_zero() {
        assert_eq!(parse_percent(""), 0.0);
        assert_eq!(parse_percent("n/a"), 0.0);
        assert_eq!(parse_percent("１２％"), 0.0); // full-width digits are not numbers
    }

    #[test]
    fn memory_units_convert_to_mb() {
        assert_eq!(parse_memory_mb("100MiB / 1GiB"), 100.0);
        assert_eq!(parse_memory_mb("2GiB / 4GiB"), 2048.0);
        assert_eq!(parse_memory_mb("512KiB / 1GiB"), 0.5);
        assert_eq!(parse_memory_mb("500MB"), 500.0);
        assert_eq!(parse_memory_mb("1.5GB"), 1500.0);
        assert_eq!(parse_memory_mb("250KB"), 0.25);
    }

    #[test]
    fn memory_bare_bytes_and_garbage() {
        let one_mb = parse_memory_mb("1048576B");
        assert!((one_mb - 1.0).abs() < 1e-9);
        assert_eq!(parse_memory_mb(""), 0.0);
        assert_eq!(parse_memory_mb("lots"), 0.0);
    }

    #[test]
    fn memory_percent_round_trip() {
        // parse_memory_mb(used) / total reproduces the reported percent.
        let total_mb = 1024.0;
        for (usage, percent) in [
            ("102.4MiB / 1GiB", "10.0%"),
            ("512MiB / 1GiB", "50.0%"),
            ("921.6MiB / 1GiB", "90.0%"),
        ] {
            let computed = parse_memory_mb(usage) / total_mb * 100.0;
            let reported = parse_percent(percent);
            assert!(
                (computed - reported).abs() <= 1.0,
                "{usage}: computed {computed}, reported {reported}"
            );
        }
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_bytes("hello", 10), "hello");
        assert_eq!(truncate_bytes("hello", 3), "hel");
        // multi-byte char straddling the cut point is dropped whole
        let s = "ab\u{1F680}cd";
        assert_eq!(truncate_bytes(s, 4), "ab");
    }

    #[test]
    fn event_parses_die_with_exit_code() {
        let line = r#"{"Action":"die","Type":"container","Actor":{"ID":"abc","Attributes":{"name":"web","exitCode":"137"}}}"#;
        let event = ContainerEvent::from_json_line(line).unwrap();
        assert_eq!(event.action, "die");
        assert_eq!(event.container_name(), Some("web"));
        assert_eq!(event.attributes.get("exitCode").map(String::as_str), Some("137"));
    }

    #[test]
    fn event_rejects_malformed_line() {
        assert!(ContainerEvent::from_json_line("not json").is_none());
    }
}
