//! Network probe — active connection counts from in-container netstat.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::client::runtime::ContainerRuntime;

const NETSTAT_TIMEOUT: Duration = Duration::from_secs(10);

/// Count ESTABLISHED foreign peers inside a container. A container
/// without netstat (or without the tools at all) reports an empty map.
pub async fn active_connections(
    runtime: &dyn ContainerRuntime,
    name: &str,
) -> BTreeMap<String, u32> {
    let argv = vec!["netstat".to_string(), "-ntu".to_string()];
    match runtime.exec(name, &argv, NETSTAT_TIMEOUT).await {
        Ok(out) if out.ok() => parse_netstat(&out.stdout),
        _ => BTreeMap::new(),
    }
}

/// Parse `netstat -ntu` output into remote-IP → connection count.
///
/// Only tcp/udp rows in ESTABLISHED state count; loopback and `::`
/// addresses are excluded.
pub fn parse_netstat(output: &str) -> BTreeMap<String, u32> {
    let mut counts = BTreeMap::new();

    for line in output.lines() {
        if line.contains("Active Internet") || line.contains("Proto") {
            continue;
        }
        if !(line.starts_with("tcp") || line.starts_with("udp")) {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 6 || parts[5] != "ESTABLISHED" {
            continue;
        }

        let foreign = parts[4];
        let Some(ip) = foreign.split(':').next() else {
            continue;
        };
        if ip.is_empty() || ip == "127.0.0.1" || ip.starts_with("::") {
            continue;
        }
        *counts.entry(ip.to_string()).or_insert(0) += 1;
    }

    counts
}
