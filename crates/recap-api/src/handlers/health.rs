//! Health check handler.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub active_sessions: usize,
    pub cached_artifacts: usize,
    pub timestamp: String,
}

/// Health probe reporting active session count and cached-artifact count.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_sessions: state.store.active_session_count().await,
        cached_artifacts: state.coordinator.cached_artifact_count(),
        timestamp: Utc::now().to_rfc3339(),
    })
}
