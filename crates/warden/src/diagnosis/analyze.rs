//! Analyze node — rule pre-check, LLM call, tolerant response parsing.
//!
//! The rule pre-check is normative, not an optimization: a compromised
//! or crash-looping container gets its command without waiting on (or
//! trusting) the model.

use serde::Deserialize;

use crate::evidence::collect::MALICIOUS_PROCESS_MARKER;
use crate::evidence::model::{Evidence, FaultKind};

use super::llm::ChatModel;
use super::prompt::{build_user_prompt, SYSTEM_PROMPT};
use super::state::{Command, Decision, DecisionParams};

/// Crash-loop threshold for the pre-check.
const RESTART_STORM_LIMIT: i64 = 5;

/// Analyze output: the decision plus any structured error that occurred
/// on the way to it. An error never suppresses the decision — the router
/// decides what to do with the pair.
pub struct Analysis {
    pub decision: Decision,
    pub error: Option<String>,
}

fn params_from(evidence: &Evidence) -> DecisionParams {
    DecisionParams {
        container_name: evidence.container_name().to_string(),
        current_cpu: evidence.evidence.cpu_percent.clone(),
        current_memory: evidence.evidence.memory_percent.clone(),
        retry_count: 0,
    }
}

pub async fn analyze_evidence(chat: &dyn ChatModel, evidence: &Evidence) -> Analysis {
    // 1. compromised container: snapshot and isolate, no model involved
    if evidence
        .evidence
        .security_issues
        .iter()
        .any(|issue| issue.contains(MALICIOUS_PROCESS_MARKER))
    {
        return Analysis {
            decision: Decision {
                fault_type: FaultKind::SecurityIncident,
                command: Command::Commit,
                params: params_from(evidence),
                reason: "malicious process signal in evidence; taking forensic snapshot"
                    .to_string(),
            },
            error: None,
        };
    }

    // 2. crash loop: restarting again is pointless
    if evidence.evidence.restart_count_24h > RESTART_STORM_LIMIT {
        return Analysis {
            decision: Decision {
                fault_type: FaultKind::ProcessCrash,
                command: Command::Stop,
                params: params_from(evidence),
                reason: format!(
                    "container restarted {} times in 24h; stopping the crash loop",
                    evidence.evidence.restart_count_24h
                ),
            },
            error: None,
        };
    }

    // 3. no credential: degrade to alerting
    if !chat.available() {
        return Analysis {
            decision: Decision {
                fault_type: evidence.fault_type,
                command: Command::AlertOnly,
                params: params_from(evidence),
                reason: "LLM unavailable, alerting without diagnosis".to_string(),
            },
            error: Some("LLM API key missing".to_string()),
        };
    }

    // 4. model call
    match chat.chat(SYSTEM_PROMPT, &build_user_prompt(evidence)).await {
        Ok(text) => parse_decision(&text, evidence),
        Err(e) => Analysis {
            decision: Decision {
                fault_type: evidence.fault_type,
                command: Command::AlertOnly,
                params: params_from(evidence),
                reason: "LLM call failed, alerting without diagnosis".to_string(),
            },
            error: Some(e.to_string()),
        },
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDecision {
    fault_type: Option<String>,
    command: Option<String>,
    params: Option<DecisionParams>,
    reason: Option<String>,
}

/// Parse the model's reply. Tolerates a ```json fence and trailing
/// whitespace; anything unparsable degrades to ALERT_ONLY with the error
/// preserved for the router.
fn parse_decision(text: &str, evidence: &Evidence) -> Analysis {
    let body = strip_code_fence(text);

    let raw: RawDecision = match serde_json::from_str(body) {
        Ok(raw) => raw,
        Err(e) => {
            return Analysis {
                decision: Decision {
                    fault_type: evidence.fault_type,
                    command: Command::AlertOnly,
                    params: params_from(evidence),
                    reason: format!("unparsable diagnosis reply: {}", truncated(body, 200)),
                },
                error: Some(format!("JSON_PARSE_ERROR: {e}")),
            };
        }
    };

    let fault_type = raw
        .fault_type
        .as_deref()
        .map(FaultKind::parse)
        .unwrap_or(evidence.fault_type);

    let (command, mut reason) = match raw.command.as_deref() {
        Some(label) => match Command::parse(label) {
            Some(command) => (command, raw.reason.unwrap_or_default()),
            None => (
                Command::AlertOnly,
                format!("unknown command '{label}' in diagnosis, defaulting to ALERT_ONLY"),
            ),
        },
        None => (
            Command::AlertOnly,
            "diagnosis missing command, defaulting to ALERT_ONLY".to_string(),
        ),
    };
    if reason.is_empty() {
        reason = "no reason given".to_string();
    }

    let mut params = raw.params.unwrap_or_else(|| params_from(evidence));
    // never trust the model's idea of which container this is
    params.container_name = evidence.container_name().to_string();
    if params.current_cpu.is_empty() {
        params.current_cpu = evidence.evidence.cpu_percent.clone();
    }
    if params.current_memory.is_empty() {
        params.current_memory = evidence.evidence.memory_percent.clone();
    }

    Analysis {
        decision: Decision {
            fault_type,
            command,
            params,
            reason,
        },
        error: None,
    }
}

/// Strip a Markdown code fence (with optional `json` tag) around a reply.
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

fn truncated(s: &str, max: usize) -> &str {
    crate::docker::inventory::truncate_bytes(s, max)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::diagnosis::llm::FakeChat;
    use crate::docker::inventory::ContainerInfo;
    use crate::evidence::model::{EvidenceDetail, HealthStatus, ThresholdSnapshot};
    use std::collections::BTreeMap;

    pub(crate) fn evidence(name: &str, fault: FaultKind) -> Evidence {
        Evidence {
            event_id: "evt_20250601_120000".to_string(),
            timestamp: "2025-06-01T12:00:00Z".to_string(),
            container: ContainerInfo {
                name: name.to_string(),
                status: "running".to_string(),
                running: true,
                ..Default::default()
            },
            evidence: EvidenceDetail {
                exit_code: 0,
                oom_killed: false,
                error_message: String::new(),
                cpu_percent: "5.0%".to_string(),
                memory_percent: "20.0%".to_string(),
                memory_usage: "200MiB / 1GiB".to_string(),
                logs_tail: String::new(),
                security_issues: Vec::new(),
                active_connections: BTreeMap::new(),
                restart_count_24h: 0,
                health_check: HealthStatus::default(),
            },
            fault_type: fault,
            thresholds: ThresholdSnapshot {
                cpu_warning: 70.0,
                cpu_critical: 90.0,
                memory_warning: 70.0,
                memory_critical: 85.0,
            },
        }
    }

    #[tokio::test]
    async fn malicious_process_short_circuits_to_commit() {
        let chat = FakeChat::replying("{\"command\": \"NONE\"}");
        let mut e = evidence("pwned", FaultKind::MaliciousProcess);
        e.evidence
            .security_issues
            .push(format!("{MALICIOUS_PROCESS_MARKER}: [\"xmrig\"]"));

        let analysis = analyze_evidence(&chat, &e).await;
        assert_eq!(analysis.decision.command, Command::Commit);
        assert_eq!(analysis.decision.fault_type, FaultKind::SecurityIncident);
        assert_eq!(chat.call_count(), 0); // the model was never consulted
    }

    #[tokio::test]
    async fn crash_loop_short_circuits_to_stop() {
        let chat = FakeChat::replying("{\"command\": \"RESTART\"}");
        let mut e = evidence("crashy", FaultKind::ProcessCrash);
        e.evidence.restart_count_24h = 6;
        e.evidence.exit_code = 1;

        let analysis = analyze_evidence(&chat, &e).await;
        assert_eq!(analysis.decision.command, Command::Stop);
        assert_eq!(analysis.decision.fault_type, FaultKind::ProcessCrash);
        assert_eq!(chat.call_count(), 0);
    }

    #[tokio::test]
    async fn missing_credential_degrades_to_alert() {
        let chat = FakeChat::unconfigured();
        let analysis = analyze_evidence(&chat, &evidence("web", FaultKind::CpuHigh)).await;
        assert_eq!(analysis.decision.command, Command::AlertOnly);
        assert!(analysis.error.unwrap().contains("API key"));
    }

    #[tokio::test]
    async fn fenced_reply_parses() {
        let chat = FakeChat::replying(
            "```json\n{\"fault_type\": \"CPU_HIGH\", \"command\": \"ALERT_ONLY\", \"reason\": \"high but stable\"}\n```  \n",
        );
        let analysis = analyze_evidence(&chat, &evidence("web", FaultKind::CpuHigh)).await;
        assert_eq!(analysis.decision.command, Command::AlertOnly);
        assert_eq!(analysis.decision.reason, "high but stable");
        assert!(analysis.error.is_none());
    }

    #[tokio::test]
    async fn unfenced_reply_with_whitespace_parses() {
        let chat = FakeChat::replying("  {\"command\": \"NONE\", \"reason\": \"all good\"}\n\n");
        let analysis = analyze_evidence(&chat, &evidence("web", FaultKind::NoError)).await;
        assert_eq!(analysis.decision.command, Command::None);
    }

    #[tokio::test]
    async fn garbage_reply_defaults_to_alert_with_error() {
        let chat = FakeChat::replying("The container looks unhealthy to me.");
        let analysis = analyze_evidence(&chat, &evidence("web", FaultKind::MemoryHigh)).await;
        assert_eq!(analysis.decision.command, Command::AlertOnly);
        assert!(analysis.error.unwrap().starts_with("JSON_PARSE_ERROR"));
        assert_eq!(analysis.decision.fault_type, FaultKind::MemoryHigh);
    }

    #[tokio::test]
    async fn missing_command_defaults_to_alert() {
        let chat = FakeChat::replying("{\"fault_type\": \"CPU_HIGH\", \"reason\": \"hm\"}");
        let analysis = analyze_evidence(&chat, &evidence("web", FaultKind::CpuHigh)).await;
        assert_eq!(analysis.decision.command, Command::AlertOnly);
        assert!(analysis.decision.reason.contains("missing command"));
    }

    #[tokio::test]
    async fn unknown_command_defaults_to_alert() {
        let chat = FakeChat::replying("{\"command\": \"REBOOT_HOST\"}");
        let analysis = analyze_evidence(&chat, &evidence("web", FaultKind::CpuHigh)).await;
        assert_eq!(analysis.decision.command, Command::AlertOnly);
        assert!(analysis.decision.reason.contains("REBOOT_HOST"));
    }

    #[tokio::test]
    async fn container_name_is_always_forced() {
        let chat = FakeChat::replying(
            "{\"command\": \"RESTART\", \"params\": {\"container_name\": \"some-other-box\"}}",
        );
        let analysis = analyze_evidence(&chat, &evidence("web", FaultKind::ProcessCrash)).await;
        assert_eq!(analysis.decision.params.container_name, "web");
        // cpu/mem backfilled from evidence
        assert_eq!(analysis.decision.params.current_cpu, "5.0%");
    }

    #[tokio::test]
    async fn llm_failure_keeps_error_and_alerts() {
        let chat = FakeChat::failing("HTTP 500: upstream exploded");
        let analysis = analyze_evidence(&chat, &evidence("web", FaultKind::CpuHigh)).await;
        assert_eq!(analysis.decision.command, Command::AlertOnly);
        assert!(analysis.error.unwrap().contains("upstream exploded"));
    }

    #[test]
    fn fence_stripping_variants() {
        assert_eq!(strip_code_fence("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  {\"a\":1}  \n"), "{\"a\":1}");
    }
}
