//! Health and metrics endpoints.

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::metrics;
use crate::state::AppState;

/// `GET /v1/health`
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "active_sessions": state.manager.active_sessions().await,
    }))
}

/// `GET /metrics`
pub async fn metrics_handler() -> String {
    metrics::render()
}
