//! Webhook receiver for broadcast platform events.
//!
//! Events arrive signed with HMAC-SHA256 over the raw body, hex-encoded
//! in the `x-recap-signature` header. Verification uses the `Mac` API's
//! constant-time comparison. The handlers themselves are thin: they
//! translate platform events into store operations.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, warn};

use recap_models::{ChannelId, Clip};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Header carrying the hex HMAC-SHA256 of the request body.
pub const SIGNATURE_HEADER: &str = "x-recap-signature";

type HmacSha256 = Hmac<Sha256>;

/// Sign a payload the way the platform collaborator does.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    mac.finalize()
        .into_bytes()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Verify a hex signature against a payload. Constant-time on the digest
/// comparison.
pub fn verify(secret: &str, body: &[u8], signature_hex: &str) -> bool {
    let Some(provided) = decode_hex(signature_hex) else {
        return false;
    };
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    mac.verify_slice(&provided).is_ok()
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
        .collect()
}

fn check_signature(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<(), ApiError> {
    let Some(secret) = state.config.webhook_secret.as_deref() else {
        debug!("No webhook secret configured, skipping signature check");
        return Ok(());
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::SignatureInvalid)?;

    if verify(secret, body, signature) {
        Ok(())
    } else {
        warn!("Webhook signature verification failed");
        Err(ApiError::SignatureInvalid)
    }
}

/// Clip-creation event from the platform.
#[derive(Debug, Deserialize)]
pub struct ClipEvent {
    pub channel_id: String,
    pub category: String,
    pub segment_start: DateTime<Utc>,
    pub segment_end: DateTime<Utc>,
}

/// Receive a clip-creation event: creates one clip and closes the prior
/// session segment.
pub async fn clip_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Clip>)> {
    check_signature(&state, &headers, &body)?;

    let event: ClipEvent = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("invalid clip event: {e}")))?;

    let clip = state
        .store
        .record_clip_event(
            ChannelId::from_string(event.channel_id),
            event.category,
            event.segment_start,
            event.segment_end,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(clip)))
}

/// Stream lifecycle event from the platform.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    StreamOnline {
        channel_id: String,
        category: String,
        timestamp: Option<DateTime<Utc>>,
    },
    StreamOffline {
        channel_id: String,
        timestamp: Option<DateTime<Utc>>,
    },
    CategoryChange {
        channel_id: String,
        category: String,
        timestamp: Option<DateTime<Utc>>,
    },
}

/// Receive a stream lifecycle event maintaining the session registry.
pub async fn stream_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<StatusCode> {
    check_signature(&state, &headers, &body)?;

    let event: StreamEvent = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("invalid stream event: {e}")))?;

    match event {
        StreamEvent::StreamOnline {
            channel_id,
            category,
            timestamp,
        } => {
            state
                .store
                .stream_online(
                    ChannelId::from_string(channel_id),
                    category,
                    timestamp.unwrap_or_else(Utc::now),
                )
                .await;
        }
        StreamEvent::StreamOffline {
            channel_id,
            timestamp,
        } => {
            state
                .store
                .stream_offline(
                    &ChannelId::from_string(channel_id),
                    timestamp.unwrap_or_else(Utc::now),
                )
                .await?;
        }
        StreamEvent::CategoryChange {
            channel_id,
            category,
            timestamp,
        } => {
            state
                .store
                .change_category(
                    &ChannelId::from_string(channel_id),
                    category,
                    timestamp.unwrap_or_else(Utc::now),
                )
                .await?;
        }
    }

    Ok(StatusCode::NO_CONTENT)
}
