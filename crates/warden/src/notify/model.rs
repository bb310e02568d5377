//! Notification model — the typed payloads the mailer can render.

use serde::{Deserialize, Serialize};

/// One outbound notification. The `type` tag doubles as the wire format
/// for the `/notify` HTTP endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// Anomaly detected; no action taken (or action pending).
    Alert {
        container_name: String,
        #[serde(default)]
        fault_type: String,
        #[serde(default)]
        current_cpu: String,
        #[serde(default)]
        current_memory: String,
        #[serde(default)]
        reason: String,
    },
    /// An executor action finished; carries the full result.
    ActionResult {
        container_name: String,
        #[serde(default)]
        command: String,
        #[serde(default)]
        fault_type: String,
        #[serde(default)]
        action_response: serde_json::Value,
    },
    /// Container transitioned back to healthy.
    Recovery {
        container_name: String,
        #[serde(default)]
        message: String,
    },
    /// Circuit breaker opened; operator attention required.
    CircuitBreak {
        container_name: String,
        #[serde(default)]
        fault_type: String,
        #[serde(default)]
        reason: String,
    },
}

impl Notification {
    pub fn container_name(&self) -> &str {
        match self {
            Notification::Alert { container_name, .. }
            | Notification::ActionResult { container_name, .. }
            | Notification::Recovery { container_name, .. }
            | Notification::CircuitBreak { container_name, .. } => container_name,
        }
    }
}

/// Result of a send attempt. Mirrors the `/notify` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }
}
