//! Stream session and channel models.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque identifier for a broadcast channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub String);

impl ChannelId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ChannelId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ChannelId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A live broadcast session on one channel.
///
/// One session exists per active channel. A category change closes the
/// current segment and opens the next; stream-offline closes the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSession {
    /// Channel this session belongs to
    pub channel_id: ChannelId,

    /// When the stream went live
    pub started_at: DateTime<Utc>,

    /// Category of the currently open segment
    pub current_category: String,

    /// Start of the currently open segment
    pub last_segment_start: DateTime<Utc>,

    /// Set when the stream goes offline
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

impl StreamSession {
    /// Open a new session at stream-online time.
    pub fn start(channel_id: ChannelId, category: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            channel_id,
            started_at: at,
            current_category: category.into(),
            last_segment_start: at,
            ended_at: None,
        }
    }

    /// Close the current segment and open the next one under a new category.
    pub fn change_category(&mut self, category: impl Into<String>, at: DateTime<Utc>) {
        self.current_category = category.into();
        self.last_segment_start = at;
    }

    /// Close the session at stream-offline time.
    pub fn end(&mut self, at: DateTime<Utc>) {
        self.ended_at = Some(at);
    }

    /// Whether the session is still live.
    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_change_opens_new_segment() {
        let t0 = Utc::now();
        let mut session = StreamSession::start(ChannelId::from("c1"), "Just Chatting", t0);
        assert_eq!(session.last_segment_start, t0);

        let t1 = t0 + chrono::Duration::minutes(10);
        session.change_category("Minecraft", t1);

        assert_eq!(session.current_category, "Minecraft");
        assert_eq!(session.last_segment_start, t1);
        assert!(session.is_active());
    }

    #[test]
    fn test_end_closes_session() {
        let t0 = Utc::now();
        let mut session = StreamSession::start(ChannelId::from("c1"), "IRL", t0);
        session.end(t0 + chrono::Duration::hours(2));
        assert!(!session.is_active());
    }
}
