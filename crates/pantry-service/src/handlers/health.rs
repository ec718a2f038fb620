//! Health check handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use pantry_engine::SchedulerStatus;
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service name.
    pub service: String,
    /// Service version.
    pub version: String,
    /// Background scheduler state, when one is running.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduler: Option<SchedulerStatus>,
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "pantry".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        scheduler: state.scheduler_status(),
    })
}
