//! Decision model — the diagnosis step's output and the run summary.

use serde::{Deserialize, Serialize};

use crate::evidence::model::FaultKind;

/// Closed set of remediation commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    Restart,
    Stop,
    Commit,
    AlertOnly,
    None,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Restart => "RESTART",
            Command::Stop => "STOP",
            Command::Commit => "COMMIT",
            Command::AlertOnly => "ALERT_ONLY",
            Command::None => "NONE",
        }
    }

    /// Strict parse; the analyze step maps `None` (unknown) to the safe
    /// default with a diagnostic reason.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_uppercase().as_str() {
            "RESTART" => Some(Command::Restart),
            "STOP" => Some(Command::Stop),
            "COMMIT" => Some(Command::Commit),
            "ALERT_ONLY" => Some(Command::AlertOnly),
            "NONE" => Some(Command::None),
            _ => Option::None,
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters the diagnoser attaches to its decision. `container_name`
/// is always overwritten with the evidence's true name before the
/// decision leaves the analyze step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionParams {
    pub container_name: String,
    pub current_cpu: String,
    pub current_memory: String,
    pub retry_count: i64,
}

/// The chosen remediation plus its justification.
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub fault_type: FaultKind,
    pub command: Command,
    pub params: DecisionParams,
    pub reason: String,
}

/// Trimmed summary of one graph run; this is what reaches the journal.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosisOutcome {
    pub container: String,
    pub fault_type: FaultKind,
    pub command: Command,
    pub reason: String,
    pub action_success: Option<bool>,
    pub error: Option<String>,
}
