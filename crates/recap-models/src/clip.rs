//! Clip models.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::ChannelId;

/// Opaque unique identifier for a clip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipId(pub String);

impl ClipId {
    /// Generate a new random clip ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClipId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ClipId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A short clip captured during a broadcast.
///
/// Clips are append-only per channel and immutable once created, except
/// for the `processed` flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clip {
    /// Unique clip ID
    pub id: ClipId,

    /// Channel the clip was captured from
    pub channel_id: ChannelId,

    /// Category the channel was in when the clip was captured
    pub category: String,

    /// Display title
    pub title: String,

    /// Start of the clipped window. Always before `end_time`.
    pub start_time: DateTime<Utc>,

    /// End of the clipped window
    pub end_time: DateTime<Utc>,

    /// When the clip record was created
    pub created_at: DateTime<Utc>,

    /// Whether the clip media has been through post-processing
    #[serde(default)]
    pub processed: bool,
}

impl Clip {
    /// Create a new clip record. Returns `None` when the time bounds are
    /// inverted or empty (`start_time < end_time` is a model invariant).
    pub fn new(
        channel_id: ChannelId,
        category: impl Into<String>,
        title: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Option<Self> {
        if start_time >= end_time {
            return None;
        }
        Some(Self {
            id: ClipId::new(),
            channel_id,
            category: category.into(),
            title: title.into(),
            start_time,
            end_time,
            created_at: Utc::now(),
            processed: false,
        })
    }

    /// Clipped window length.
    pub fn window(&self) -> chrono::Duration {
        self.end_time - self.start_time
    }
}
