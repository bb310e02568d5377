//! Action result model — the executor's only output type.
//!
//! Execution failures are values, not errors; nothing in the executor
//! propagates an `Err` past this shape.

use chrono::Utc;
use serde::Serialize;

use crate::evidence::model::HealthStatus;

/// Post-verification of a STOP.
#[derive(Debug, Clone, Serialize)]
pub struct StopVerification {
    pub is_stopped: bool,
    pub reason: String,
}

/// One RESTART attempt, recorded whether it passed or failed.
#[derive(Debug, Clone, Serialize)]
pub struct RestartAttempt {
    pub attempt: usize,
    pub timestamp: String,
    pub restart_success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub running: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_percent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_percent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthStatus>,
    /// 1 = unhealthy, 2 = cpu too high, 3 = memory too high.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_flag: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RestartAttempt {
    pub fn new(attempt: usize) -> Self {
        Self {
            attempt,
            timestamp: Utc::now().to_rfc3339(),
            restart_success: false,
            running: None,
            cpu_percent: None,
            memory_percent: None,
            health_check: None,
            failure_flag: None,
            reason: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionResult {
    pub success: bool,
    pub action: String,
    pub container: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<StopVerification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_recovered: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_attempts: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<RestartAttempt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_result: Option<Box<ActionResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub timestamp: String,
}

impl ActionResult {
    pub fn base(action: &str, container: &str) -> Self {
        Self {
            success: false,
            action: action.to_string(),
            container: container.to_string(),
            output: None,
            error: None,
            verification: None,
            is_recovered: None,
            total_attempts: None,
            attempts: Vec::new(),
            final_action: None,
            stop_result: None,
            image_name: None,
            reason: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn rejected(action: &str, container: &str, error: impl Into<String>) -> Self {
        let mut result = Self::base(action, container);
        result.error = Some(error.into());
        result
    }
}
