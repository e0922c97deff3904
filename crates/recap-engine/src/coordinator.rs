//! Generation coordinator: cache + single-flight lifecycle per recap key.
//!
//! State machine per key: `Idle -> InFlight -> {Done | Failed}`. The
//! cache check and the in-flight check-and-mark happen under one lock
//! acquisition with no await inside, so two concurrent requests for the
//! same key can never both start an encode. Waiters subscribe to the
//! generating request's completion signal (a `watch` channel) instead of
//! polling, with a bounded wait.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use recap_media::{ClipMediaSource, RecapEncoder};
use recap_models::{Artifact, ArtifactId, ChannelId, ClipId, RecapKey};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::store::RecapStore;
use crate::{manifest, selector};

/// Lifecycle of one generation, published to waiters.
#[derive(Debug, Clone)]
enum GenerationState {
    InFlight,
    Done(Artifact),
    Failed(String),
}

/// The only shared mutable state of the engine: the artifact cache and
/// the in-flight marker set. All mutation goes through the coordinator.
#[derive(Default)]
struct Shared {
    cache: HashMap<RecapKey, Artifact>,
    in_flight: HashMap<RecapKey, watch::Receiver<GenerationState>>,
}

/// Outcome of admission for one request.
enum Admission {
    Cached(Artifact),
    Wait(watch::Receiver<GenerationState>),
    Generate(watch::Sender<GenerationState>),
}

/// Owns one generation's in-flight marker for the duration of the run.
///
/// The marker is cleared and a terminal state published either through
/// [`InFlightGuard::complete`] or, when the generating future is dropped
/// mid-run (axum drops a handler future when the client disconnects), by
/// the `Drop` impl. An abandoned generation therefore never strands its
/// key: waiters see `Failed` and the next request starts fresh.
struct InFlightGuard<'a> {
    coordinator: &'a GenerationCoordinator,
    key: RecapKey,
    tx: Option<watch::Sender<GenerationState>>,
}

impl InFlightGuard<'_> {
    /// Publish the terminal state. The marker and the cache entry flip
    /// under one lock so the two are never observable together.
    fn complete(mut self, result: &EngineResult<Artifact>) {
        let Some(tx) = self.tx.take() else { return };
        let state = match result {
            Ok(artifact) => GenerationState::Done(artifact.clone()),
            Err(e) => GenerationState::Failed(e.to_string()),
        };
        {
            let mut shared = self
                .coordinator
                .shared
                .lock()
                .expect("coordinator lock poisoned");
            shared.in_flight.remove(&self.key);
            if let Ok(artifact) = result {
                shared.cache.insert(self.key.clone(), artifact.clone());
            }
        }
        tx.send_replace(state);
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let Some(tx) = self.tx.take() else { return };
        warn!(key = %self.key, "Generation dropped before completing, clearing marker");
        if let Ok(mut shared) = self.coordinator.shared.lock() {
            shared.in_flight.remove(&self.key);
        }
        tx.send_replace(GenerationState::Failed("generation cancelled".to_string()));
    }
}

/// A recap artifact plus whether it was served from cache.
#[derive(Debug, Clone)]
pub struct RecapResponse {
    pub artifact: Artifact,
    pub cached: bool,
}

/// Orchestrates selection, media resolution, manifest construction, and
/// encoding behind a per-key cache and single-flight guard.
pub struct GenerationCoordinator {
    store: Arc<RecapStore>,
    media: Arc<dyn ClipMediaSource>,
    encoder: Arc<dyn RecapEncoder>,
    config: EngineConfig,
    shared: Mutex<Shared>,
}

impl GenerationCoordinator {
    pub fn new(
        store: Arc<RecapStore>,
        media: Arc<dyn ClipMediaSource>,
        encoder: Arc<dyn RecapEncoder>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            media,
            encoder,
            config,
            shared: Mutex::new(Shared::default()),
        }
    }

    /// Return the recap for `(channel_id, minutes_late)` at `now`,
    /// generating it if no cached artifact exists for the key's time
    /// bucket.
    pub async fn get_or_create(
        &self,
        channel_id: ChannelId,
        minutes_late: u32,
        now: DateTime<Utc>,
    ) -> EngineResult<RecapResponse> {
        let key = RecapKey::new(
            channel_id,
            minutes_late,
            now.timestamp_millis().max(0) as u64,
            self.config.cache_bucket_ms(),
        );

        match self.admit(&key) {
            Admission::Cached(artifact) => {
                info!(key = %key, "Recap served from cache");
                Ok(RecapResponse {
                    artifact,
                    cached: true,
                })
            }
            Admission::Wait(rx) => self.wait_for_generation(&key, rx).await,
            Admission::Generate(tx) => self.run_generation(&key, now, tx).await,
        }
    }

    /// Atomic cache check + in-flight check-and-mark. Never awaits.
    fn admit(&self, key: &RecapKey) -> Admission {
        let mut shared = self.shared.lock().expect("coordinator lock poisoned");

        if let Some(artifact) = shared.cache.get(key) {
            return Admission::Cached(artifact.clone());
        }
        if let Some(rx) = shared.in_flight.get(key) {
            return Admission::Wait(rx.clone());
        }

        let (tx, rx) = watch::channel(GenerationState::InFlight);
        shared.in_flight.insert(key.clone(), rx);
        Admission::Generate(tx)
    }

    /// Drive one generation to a terminal state and publish it.
    ///
    /// The in-flight marker is cleared on every exit path: success,
    /// failure, and cancellation of this future (the guard's `Drop` runs
    /// even when the caller's task is aborted).
    async fn run_generation(
        &self,
        key: &RecapKey,
        now: DateTime<Utc>,
        tx: watch::Sender<GenerationState>,
    ) -> EngineResult<RecapResponse> {
        let guard = InFlightGuard {
            coordinator: self,
            key: key.clone(),
            tx: Some(tx),
        };

        info!(key = %key, "Starting recap generation");
        let result = self.generate(key, now).await;
        if let Err(e) = &result {
            warn!(key = %key, error = %e, "Recap generation failed");
        }
        guard.complete(&result);

        result.map(|artifact| RecapResponse {
            artifact,
            cached: false,
        })
    }

    /// Wait (bounded) for another request's generation of the same key.
    async fn wait_for_generation(
        &self,
        key: &RecapKey,
        mut rx: watch::Receiver<GenerationState>,
    ) -> EngineResult<RecapResponse> {
        info!(key = %key, "Generation already in flight, waiting");

        let outcome = tokio::time::timeout(self.config.waiter_timeout, async {
            loop {
                match rx.borrow_and_update().clone() {
                    GenerationState::Done(artifact) => return Ok(artifact),
                    GenerationState::Failed(msg) => return Err(EngineError::Generation(msg)),
                    GenerationState::InFlight => {}
                }
                if rx.changed().await.is_err() {
                    // Sender gone; one last look for a terminal state.
                    return match rx.borrow().clone() {
                        GenerationState::Done(artifact) => Ok(artifact),
                        GenerationState::Failed(msg) => Err(EngineError::Generation(msg)),
                        GenerationState::InFlight => Err(EngineError::Generation(
                            "generation ended without a result".to_string(),
                        )),
                    };
                }
            }
        })
        .await;

        match outcome {
            Ok(result) => result.map(|artifact| RecapResponse {
                artifact,
                cached: false,
            }),
            Err(_) => {
                // The original generation continues unaffected.
                warn!(key = %key, "Timed out waiting on in-flight generation");
                Err(EngineError::Timeout)
            }
        }
    }

    /// One full generation pass: select, budget, resolve media, encode.
    async fn generate(&self, key: &RecapKey, now: DateTime<Utc>) -> EngineResult<Artifact> {
        let clips = self.store.clips_for(&key.channel_id).await;
        let selected = selector::select(&clips, key.minutes_late, now)?;

        let per_clip = manifest::per_clip_seconds(selected.len());
        let mut media_paths = Vec::with_capacity(selected.len());
        for clip in &selected {
            media_paths.push(self.media.resolve(clip, per_clip).await?);
        }

        let (entries, duration_per_clip) = manifest::build(media_paths);
        let output_path = self.config.videos_dir.join(key.artifact_filename());
        let encoded = self.encoder.encode(key, &entries, &output_path).await?;

        let clip_ids: Vec<ClipId> = selected.iter().map(|c| c.id.clone()).collect();
        self.store.mark_processed(&key.channel_id, &clip_ids).await;

        info!(
            key = %key,
            clips = entries.len(),
            duration_per_clip,
            size_bytes = encoded.size_bytes,
            "Recap artifact created"
        );

        Ok(Artifact {
            id: ArtifactId::new(),
            key: key.clone(),
            file_path: output_path,
            size_bytes: encoded.size_bytes,
            duration_seconds: encoded.duration_seconds,
            created_at: Utc::now(),
        })
    }

    /// Number of cached artifacts, for the health probe.
    pub fn cached_artifact_count(&self) -> usize {
        self.shared
            .lock()
            .expect("coordinator lock poisoned")
            .cache
            .len()
    }

    /// Artifact filenames whose keys are currently generating. The
    /// retention sweeper must not touch these.
    pub fn in_flight_filenames(&self) -> HashSet<String> {
        self.shared
            .lock()
            .expect("coordinator lock poisoned")
            .in_flight
            .keys()
            .map(|k| k.artifact_filename())
            .collect()
    }

    /// Drop any cache entry backed by the given artifact file. Called by
    /// the sweeper after deletion.
    pub fn evict_filename(&self, filename: &str) {
        let mut shared = self.shared.lock().expect("coordinator lock poisoned");
        shared.cache.retain(|key, _| key.artifact_filename() != filename);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use recap_media::{EncodedOutput, MediaError, MediaResult};
    use recap_models::{Clip, ManifestEntry};

    struct FakeSource;

    #[async_trait]
    impl ClipMediaSource for FakeSource {
        async fn resolve(&self, clip: &Clip, _duration_seconds: u32) -> MediaResult<PathBuf> {
            Ok(PathBuf::from(format!("/clips/{}.mp4", clip.id)))
        }
    }

    /// Encoder fake that counts invocations, sleeps for a configurable
    /// time, and can fail its first N calls with exit code 1.
    struct FakeEncoder {
        calls: AtomicUsize,
        delay: Duration,
        fail_first: usize,
    }

    impl FakeEncoder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
                fail_first: 0,
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn failing_first(mut self, n: usize) -> Self {
            self.fail_first = n;
            self
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RecapEncoder for FakeEncoder {
        async fn encode(
            &self,
            _key: &RecapKey,
            entries: &[ManifestEntry],
            _output_path: &Path,
        ) -> MediaResult<EncodedOutput> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if call < self.fail_first {
                return Err(MediaError::encoding_failed(Some(1), None));
            }
            Ok(EncodedOutput {
                size_bytes: 4096,
                duration_seconds: entries.iter().map(|e| e.duration_seconds).sum(),
            })
        }
    }

    async fn store_with_clips(channel: &ChannelId, now: DateTime<Utc>) -> Arc<RecapStore> {
        let store = Arc::new(RecapStore::new());
        for offset_ms in [50_000i64, 40_000, 20_000] {
            let start = now - chrono::Duration::milliseconds(offset_ms);
            store
                .add_clip(
                    channel.clone(),
                    "Minecraft",
                    "clip",
                    start,
                    start + chrono::Duration::seconds(10),
                )
                .await
                .unwrap();
        }
        store
    }

    fn coordinator(
        store: Arc<RecapStore>,
        encoder: Arc<FakeEncoder>,
        config: EngineConfig,
    ) -> Arc<GenerationCoordinator> {
        Arc::new(GenerationCoordinator::new(
            store,
            Arc::new(FakeSource),
            encoder,
            config,
        ))
    }

    #[tokio::test]
    async fn test_generation_builds_sixty_second_recap() {
        let now = Utc::now();
        let channel = ChannelId::from("c1");
        let encoder = Arc::new(FakeEncoder::new());
        let coord = coordinator(
            store_with_clips(&channel, now).await,
            encoder.clone(),
            EngineConfig::default(),
        );

        let response = coord.get_or_create(channel, 0, now).await.unwrap();
        assert!(!response.cached);
        // 3 clips -> floor(floor(60000/3)/1000) = 20s each, 60s total
        assert_eq!(response.artifact.duration_seconds, 60);
        assert_eq!(encoder.call_count(), 1);
    }

    #[tokio::test]
    async fn test_no_clips_short_circuits_before_encoder() {
        let encoder = Arc::new(FakeEncoder::new());
        let coord = coordinator(
            Arc::new(RecapStore::new()),
            encoder.clone(),
            EngineConfig::default(),
        );

        let result = coord
            .get_or_create(ChannelId::from("empty"), 0, Utc::now())
            .await;
        assert!(matches!(result, Err(EngineError::NoClips)));
        assert_eq!(encoder.call_count(), 0);
    }

    #[tokio::test]
    async fn test_second_request_hits_cache() {
        let now = Utc::now();
        let channel = ChannelId::from("c1");
        let encoder = Arc::new(FakeEncoder::new());
        let coord = coordinator(
            store_with_clips(&channel, now).await,
            encoder.clone(),
            EngineConfig::default(),
        );

        let first = coord
            .get_or_create(channel.clone(), 0, now)
            .await
            .unwrap();
        let second = coord.get_or_create(channel, 0, now).await.unwrap();

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.artifact.id, second.artifact.id);
        assert_eq!(encoder.call_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_encode() {
        let now = Utc::now();
        let channel = ChannelId::from("c1");
        let encoder = Arc::new(FakeEncoder::new().with_delay(Duration::from_millis(100)));
        let coord = coordinator(
            store_with_clips(&channel, now).await,
            encoder.clone(),
            EngineConfig::default(),
        );

        let a = {
            let coord = coord.clone();
            let channel = channel.clone();
            tokio::spawn(async move { coord.get_or_create(channel, 0, now).await })
        };
        let b = {
            let coord = coord.clone();
            tokio::spawn(async move { coord.get_or_create(channel, 0, now).await })
        };

        let a = a.await.unwrap().unwrap();
        let b = b.await.unwrap().unwrap();

        assert_eq!(encoder.call_count(), 1);
        assert_eq!(a.artifact.id, b.artifact.id);
    }

    #[tokio::test]
    async fn test_waiter_times_out_while_generation_continues() {
        let now = Utc::now();
        let channel = ChannelId::from("c1");
        let encoder = Arc::new(FakeEncoder::new().with_delay(Duration::from_millis(300)));
        let config = EngineConfig {
            waiter_timeout: Duration::from_millis(30),
            ..EngineConfig::default()
        };
        let coord = coordinator(store_with_clips(&channel, now).await, encoder.clone(), config);

        let generator = {
            let coord = coord.clone();
            let channel = channel.clone();
            tokio::spawn(async move { coord.get_or_create(channel, 0, now).await })
        };
        // Let the generator claim the key first
        tokio::time::sleep(Duration::from_millis(20)).await;

        let waiter = coord.get_or_create(channel, 0, now).await;
        assert!(matches!(waiter, Err(EngineError::Timeout)));

        // The original generation still runs to completion
        let generated = generator.await.unwrap().unwrap();
        assert_eq!(generated.artifact.duration_seconds, 60);
        assert_eq!(encoder.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failure_clears_marker_and_allows_retry() {
        let now = Utc::now();
        let channel = ChannelId::from("c1");
        let encoder = Arc::new(FakeEncoder::new().failing_first(1));
        let coord = coordinator(
            store_with_clips(&channel, now).await,
            encoder.clone(),
            EngineConfig::default(),
        );

        let first = coord.get_or_create(channel.clone(), 0, now).await;
        match first {
            Err(EngineError::Media(e)) => assert_eq!(e.exit_code(), Some(1)),
            other => panic!("expected encoding failure, got {other:?}"),
        }
        // No artifact recorded, no lingering marker
        assert_eq!(coord.cached_artifact_count(), 0);
        assert!(coord.in_flight_filenames().is_empty());

        let retry = coord.get_or_create(channel, 0, now).await.unwrap();
        assert!(!retry.cached);
        assert_eq!(encoder.call_count(), 2);
    }

    #[tokio::test]
    async fn test_aborted_generation_clears_marker_and_allows_retry() {
        let now = Utc::now();
        let channel = ChannelId::from("c1");
        let encoder = Arc::new(FakeEncoder::new().with_delay(Duration::from_millis(200)));
        let coord = coordinator(
            store_with_clips(&channel, now).await,
            encoder.clone(),
            EngineConfig::default(),
        );

        // A disconnecting client drops the handler future; aborting the
        // task reproduces that mid-encode.
        let generation = {
            let coord = coord.clone();
            let channel = channel.clone();
            tokio::spawn(async move { coord.get_or_create(channel, 0, now).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        generation.abort();
        assert!(generation.await.unwrap_err().is_cancelled());

        // Marker gone: the sweeper is not shielded and the key is free
        assert!(coord.in_flight_filenames().is_empty());
        assert_eq!(coord.cached_artifact_count(), 0);

        // A fresh request starts a second encode and succeeds
        let retry = coord.get_or_create(channel, 0, now).await.unwrap();
        assert!(!retry.cached);
        assert_eq!(retry.artifact.duration_seconds, 60);
        assert_eq!(encoder.call_count(), 2);
    }

    #[tokio::test]
    async fn test_generation_marks_selected_clips_processed() {
        let now = Utc::now();
        let channel = ChannelId::from("c1");
        let store = store_with_clips(&channel, now).await;
        let coord = coordinator(
            store.clone(),
            Arc::new(FakeEncoder::new()),
            EngineConfig::default(),
        );

        coord.get_or_create(channel.clone(), 0, now).await.unwrap();

        let clips = store.clips_for(&channel).await;
        assert!(clips.iter().all(|c| c.processed));
    }

    #[tokio::test]
    async fn test_distinct_keys_generate_independently() {
        let now = Utc::now();
        let channel = ChannelId::from("c1");
        let encoder = Arc::new(FakeEncoder::new());
        let coord = coordinator(
            store_with_clips(&channel, now).await,
            encoder.clone(),
            EngineConfig::default(),
        );

        coord
            .get_or_create(channel.clone(), 0, now)
            .await
            .unwrap();
        // Two buckets apart: a distinct key even with identical params
        let later = now + chrono::Duration::seconds(120);
        coord.get_or_create(channel, 0, later).await.unwrap();

        assert_eq!(encoder.call_count(), 2);
        assert_eq!(coord.cached_artifact_count(), 2);
    }
}
