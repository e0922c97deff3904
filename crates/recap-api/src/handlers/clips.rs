//! Clip API handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use recap_models::{ChannelId, Clip};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Create-clip request body.
#[derive(Debug, Deserialize)]
pub struct CreateClipRequest {
    pub channel_id: String,
    pub category: String,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Create a clip for a channel.
pub async fn create_clip(
    State(state): State<AppState>,
    Json(req): Json<CreateClipRequest>,
) -> ApiResult<(StatusCode, Json<Clip>)> {
    if req.channel_id.trim().is_empty() {
        return Err(ApiError::bad_request("channel_id is required"));
    }

    let clip = state
        .store
        .add_clip(
            ChannelId::from_string(req.channel_id),
            req.category,
            req.title,
            req.start_time,
            req.end_time,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(clip)))
}

/// List all clips for a channel, in append order.
pub async fn list_clips(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> ApiResult<Json<Vec<Clip>>> {
    let clips = state
        .store
        .clips_for(&ChannelId::from_string(channel_id))
        .await;
    Ok(Json(clips))
}
