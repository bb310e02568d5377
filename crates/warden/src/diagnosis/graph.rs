//! Diagnosis graph — analyze, route, act.
//!
//! A compiled instance wires the chat model, the executor, and the
//! notifier together. The node set is closed; the router maps a decision
//! to exactly one terminal node and the run ends there. The graph holds
//! no mutable state, so a single instance is shared across workers.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::evidence::model::{Evidence, FaultKind};
use crate::executor::Executor;
use crate::notify::{Notification, Notify};

use super::analyze::analyze_evidence;
use super::llm::ChatModel;
use super::state::{Command, DiagnosisOutcome};

/// Terminal nodes reachable from the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    ExecuteAction,
    SendAlert,
    NoAction,
    ErrorHandler,
}

/// Conditional router. Executable commands always execute, even when the
/// analyze step recorded an error; a non-executable decision with an
/// error goes to the error handler.
pub fn route_by_command(command: Command, error: Option<&str>) -> Node {
    match command {
        Command::Restart | Command::Stop | Command::Commit => Node::ExecuteAction,
        _ if error.is_some() => Node::ErrorHandler,
        Command::AlertOnly => Node::SendAlert,
        Command::None => Node::NoAction,
    }
}

pub struct DiagnosisGraph {
    chat: Arc<dyn ChatModel>,
    executor: Arc<Executor>,
    notifier: Arc<dyn Notify>,
}

impl DiagnosisGraph {
    pub fn new(chat: Arc<dyn ChatModel>, executor: Arc<Executor>, notifier: Arc<dyn Notify>) -> Self {
        Self {
            chat,
            executor,
            notifier,
        }
    }

    /// Run the graph for one evidence bundle.
    pub async fn run(&self, evidence: Evidence) -> DiagnosisOutcome {
        let analysis = analyze_evidence(self.chat.as_ref(), &evidence).await;
        let decision = analysis.decision;
        let error = analysis.error;

        info!(
            container = %decision.params.container_name,
            fault = %decision.fault_type,
            command = %decision.command,
            "diagnosis complete"
        );

        let node = route_by_command(decision.command, error.as_deref());
        let mut action_success = None;

        match node {
            Node::ExecuteAction => {
                let result = self
                    .executor
                    .execute(decision.command.as_str(), &decision.params.container_name)
                    .await;
                action_success = Some(result.success);

                let notification = Notification::ActionResult {
                    container_name: decision.params.container_name.clone(),
                    command: decision.command.as_str().to_string(),
                    fault_type: decision.fault_type.to_string(),
                    action_response: serde_json::to_value(&result)
                        .unwrap_or(serde_json::Value::Null),
                };
                let sent = self.notifier.send(&notification).await;
                if !sent.success {
                    debug!("action-result notification not delivered");
                }
            }

            Node::SendAlert => {
                let notification = Notification::Alert {
                    container_name: decision.params.container_name.clone(),
                    fault_type: decision.fault_type.to_string(),
                    current_cpu: decision.params.current_cpu.clone(),
                    current_memory: decision.params.current_memory.clone(),
                    reason: decision.reason.clone(),
                };
                let _ = self.notifier.send(&notification).await;
            }

            Node::NoAction => {
                debug!(container = %decision.params.container_name, "no action required");
            }

            Node::ErrorHandler => {
                error!(
                    container = %decision.params.container_name,
                    error = error.as_deref().unwrap_or(""),
                    "diagnosis error"
                );
                let notification = Notification::Alert {
                    container_name: decision.params.container_name.clone(),
                    fault_type: FaultKind::SystemError.to_string(),
                    current_cpu: decision.params.current_cpu.clone(),
                    current_memory: decision.params.current_memory.clone(),
                    reason: error.clone().unwrap_or_else(|| decision.reason.clone()),
                };
                // the handler itself must survive a failing notifier
                let _ = self.notifier.send(&notification).await;
            }
        }

        DiagnosisOutcome {
            container: evidence.container_name().to_string(),
            fault_type: decision.fault_type,
            command: decision.command,
            reason: decision.reason,
            action_success,
            error,
        }
    }
}
