//! Recap request handler.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use recap_engine::EngineError;
use recap_models::ChannelId;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Recap request body. `minutes_late` is required.
#[derive(Debug, Deserialize)]
pub struct RecapRequest {
    pub channel_id: String,
    pub minutes_late: Option<i64>,
}

/// Artifact descriptor returned to the caller.
#[derive(Debug, Serialize)]
pub struct RecapResponse {
    pub id: String,
    pub url: String,
    pub duration_seconds: u32,
    pub size_bytes: u64,
    pub cached: bool,
}

/// Request a recap for a channel. Returns a cached artifact when one
/// exists for the current time bucket, otherwise triggers (or joins) a
/// generation.
pub async fn request_recap(
    State(state): State<AppState>,
    Json(req): Json<RecapRequest>,
) -> ApiResult<Json<RecapResponse>> {
    if req.channel_id.trim().is_empty() {
        return Err(ApiError::bad_request("channel_id is required"));
    }
    let minutes_late = req
        .minutes_late
        .ok_or_else(|| EngineError::validation("minutes_late is required"))?;
    let minutes_late: u32 = minutes_late
        .try_into()
        .map_err(|_| EngineError::validation("minutes_late must be a non-negative integer"))?;

    let result = state
        .coordinator
        .get_or_create(ChannelId::from_string(req.channel_id), minutes_late, Utc::now())
        .await?;

    let filename = result
        .artifact
        .filename()
        .ok_or_else(|| ApiError::internal("artifact has no filename"))?
        .to_string();

    Ok(Json(RecapResponse {
        id: result.artifact.id.to_string(),
        url: format!("/videos/{filename}"),
        duration_seconds: result.artifact.duration_seconds,
        size_bytes: result.artifact.size_bytes,
        cached: result.cached,
    }))
}
