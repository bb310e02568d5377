//! HTTP facade — re-exposes the executor and notifier on loopback.
//!
//! There is no authentication layer; the default bind is 127.0.0.1 and
//! the service is intended to stay there.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;

use crate::executor::model::ActionResult;
use crate::executor::Executor;
use crate::notify::{Notification, Notify, SendOutcome};

pub struct ApiState {
    pub executor: Arc<Executor>,
    pub notifier: Arc<dyn Notify>,
}

#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub command: String,
    pub container_name: String,
}

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/action", post(action))
        .route("/notify", post(notify))
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok", "service": "warden"}))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "healthy"}))
}

/// Execute a whitelisted container action. Whitelist enforcement stays
/// in the executor; this handler only relays.
async fn action(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<ActionRequest>,
) -> Json<ActionResult> {
    info!(
        command = %request.command,
        container = %request.container_name,
        "action requested over HTTP"
    );
    let result = state
        .executor
        .execute(&request.command, &request.container_name)
        .await;
    Json(result)
}

/// Send a typed notification.
async fn notify(
    State(state): State<Arc<ApiState>>,
    Json(notification): Json<Notification>,
) -> Json<SendOutcome> {
    info!(container = notification.container_name(), "notification requested over HTTP");
    let outcome = state.notifier.send(&notification).await;
    Json(outcome)
}
