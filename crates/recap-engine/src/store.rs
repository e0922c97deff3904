//! Process-scoped session and clip registry.
//!
//! Sessions and clips live in one store object created at startup and
//! passed by reference to every component; nothing here persists across
//! restarts. Clips are append-only per channel and never deleted by the
//! engine.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use recap_models::{ChannelId, Clip, ClipId, StreamSession};
use tokio::sync::RwLock;
use tracing::info;

use crate::error::{EngineError, EngineResult};

#[derive(Default)]
struct Inner {
    sessions: HashMap<ChannelId, StreamSession>,
    clips: HashMap<ChannelId, Vec<Clip>>,
}

/// In-memory registry of stream sessions and clips.
#[derive(Default)]
pub struct RecapStore {
    inner: RwLock<Inner>,
}

impl RecapStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session at stream-online time. A channel going online while
    /// a session is still tracked simply starts a fresh one.
    pub async fn stream_online(
        &self,
        channel_id: ChannelId,
        category: impl Into<String>,
        at: DateTime<Utc>,
    ) {
        let session = StreamSession::start(channel_id.clone(), category, at);
        info!(channel = %channel_id, category = %session.current_category, "Stream online");
        self.inner.write().await.sessions.insert(channel_id, session);
    }

    /// Close the current segment and open the next under a new category.
    pub async fn change_category(
        &self,
        channel_id: &ChannelId,
        category: impl Into<String>,
        at: DateTime<Utc>,
    ) -> EngineResult<()> {
        let mut inner = self.inner.write().await;
        let session = inner
            .sessions
            .get_mut(channel_id)
            .filter(|s| s.is_active())
            .ok_or_else(|| EngineError::not_found(format!("no active session for {channel_id}")))?;
        session.change_category(category, at);
        Ok(())
    }

    /// Close the session at stream-offline time.
    pub async fn stream_offline(
        &self,
        channel_id: &ChannelId,
        at: DateTime<Utc>,
    ) -> EngineResult<()> {
        let mut inner = self.inner.write().await;
        let session = inner
            .sessions
            .get_mut(channel_id)
            .filter(|s| s.is_active())
            .ok_or_else(|| EngineError::not_found(format!("no active session for {channel_id}")))?;
        session.end(at);
        info!(channel = %channel_id, "Stream offline");
        Ok(())
    }

    /// Append a clip to a channel's collection.
    pub async fn add_clip(
        &self,
        channel_id: ChannelId,
        category: impl Into<String>,
        title: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> EngineResult<Clip> {
        let clip = Clip::new(channel_id.clone(), category, title, start_time, end_time)
            .ok_or_else(|| EngineError::validation("clip start_time must precede end_time"))?;

        let mut inner = self.inner.write().await;
        inner
            .clips
            .entry(channel_id)
            .or_default()
            .push(clip.clone());
        Ok(clip)
    }

    /// Consume a clip-creation event from the webhook collaborator:
    /// creates one clip spanning the finished segment and closes the prior
    /// session segment under the new category.
    pub async fn record_clip_event(
        &self,
        channel_id: ChannelId,
        category: impl Into<String>,
        segment_start: DateTime<Utc>,
        segment_end: DateTime<Utc>,
    ) -> EngineResult<Clip> {
        let category = category.into();
        let title = format!("{} highlight", category);
        let clip = self
            .add_clip(
                channel_id.clone(),
                category.clone(),
                title,
                segment_start,
                segment_end,
            )
            .await?;

        // A missing session is tolerated: clips can arrive for channels
        // whose online event was never observed.
        let mut inner = self.inner.write().await;
        if let Some(session) = inner.sessions.get_mut(&channel_id).filter(|s| s.is_active()) {
            session.change_category(category, segment_end);
        }

        info!(channel = %channel_id, clip_id = %clip.id, "Recorded clip event");
        Ok(clip)
    }

    /// Flag clips whose media has been resolved and encoded into a recap.
    /// Unknown IDs are ignored.
    pub async fn mark_processed(&self, channel_id: &ChannelId, clip_ids: &[ClipId]) {
        let mut inner = self.inner.write().await;
        if let Some(clips) = inner.clips.get_mut(channel_id) {
            for clip in clips.iter_mut() {
                if clip_ids.contains(&clip.id) {
                    clip.processed = true;
                }
            }
        }
    }

    /// All clips for a channel, in append order.
    pub async fn clips_for(&self, channel_id: &ChannelId) -> Vec<Clip> {
        self.inner
            .read()
            .await
            .clips
            .get(channel_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of currently live sessions, for the health probe.
    pub async fn active_session_count(&self) -> usize {
        self.inner
            .read()
            .await
            .sessions
            .values()
            .filter(|s| s.is_active())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> ChannelId {
        ChannelId::from("c1")
    }

    #[tokio::test]
    async fn test_clip_event_appends_and_closes_segment() {
        let store = RecapStore::new();
        let t0 = Utc::now();
        store.stream_online(channel(), "Just Chatting", t0).await;

        let seg_end = t0 + chrono::Duration::minutes(5);
        let clip = store
            .record_clip_event(channel(), "Minecraft", t0, seg_end)
            .await
            .unwrap();

        assert_eq!(clip.category, "Minecraft");
        let clips = store.clips_for(&channel()).await;
        assert_eq!(clips.len(), 1);
        assert_eq!(clips[0].id, clip.id);
    }

    #[tokio::test]
    async fn test_clip_event_without_session_still_records() {
        let store = RecapStore::new();
        let t0 = Utc::now();
        let clip = store
            .record_clip_event(channel(), "IRL", t0, t0 + chrono::Duration::seconds(30))
            .await
            .unwrap();
        assert_eq!(store.clips_for(&channel()).await.len(), 1);
        assert!(clip.title.contains("IRL"));
    }

    #[tokio::test]
    async fn test_invalid_clip_bounds_rejected() {
        let store = RecapStore::new();
        let t0 = Utc::now();
        let result = store
            .add_clip(channel(), "IRL", "bad", t0, t0 - chrono::Duration::seconds(1))
            .await;
        assert!(matches!(result, Err(EngineError::Validation(_))));
        assert!(store.clips_for(&channel()).await.is_empty());
    }

    #[tokio::test]
    async fn test_mark_processed_flags_only_named_clips() {
        let store = RecapStore::new();
        let t0 = Utc::now();
        let end = t0 + chrono::Duration::seconds(10);
        let a = store.add_clip(channel(), "IRL", "a", t0, end).await.unwrap();
        let b = store.add_clip(channel(), "IRL", "b", t0, end).await.unwrap();

        store.mark_processed(&channel(), &[a.id.clone()]).await;

        let clips = store.clips_for(&channel()).await;
        assert!(clips.iter().find(|c| c.id == a.id).unwrap().processed);
        assert!(!clips.iter().find(|c| c.id == b.id).unwrap().processed);
    }

    #[tokio::test]
    async fn test_active_session_count_tracks_offline() {
        let store = RecapStore::new();
        let t0 = Utc::now();
        store.stream_online(channel(), "IRL", t0).await;
        store.stream_online(ChannelId::from("c2"), "IRL", t0).await;
        assert_eq!(store.active_session_count().await, 2);

        store.stream_offline(&channel(), t0).await.unwrap();
        assert_eq!(store.active_session_count().await, 1);

        // Offline for a channel that was never online
        let result = store.stream_offline(&ChannelId::from("ghost"), t0).await;
        assert!(matches!(result, Err(EngineError::NotFound(_))));
    }
}
