//! Retention sweeper for generated artifacts.
//!
//! Periodically deletes recap videos past the configured maximum age.
//! Deletion is best-effort: one failed removal is logged and skipped, and
//! artifacts whose key is currently generating are never touched.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::coordinator::GenerationCoordinator;

/// Background task aging out recap artifacts.
pub struct RetentionSweeper {
    coordinator: Arc<GenerationCoordinator>,
    config: EngineConfig,
}

impl RetentionSweeper {
    pub fn new(coordinator: Arc<GenerationCoordinator>, config: EngineConfig) -> Self {
        Self {
            coordinator,
            config,
        }
    }

    /// Run the sweep loop forever. Spawn this on the runtime at startup.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.config.sweep_interval);
        // The startup tick fires immediately; skip it so a fresh process
        // doesn't sweep before serving anything.
        interval.tick().await;

        loop {
            interval.tick().await;
            let deleted = self.sweep(self.config.artifact_max_age).await;
            if deleted > 0 {
                info!(deleted, "Retention sweep removed expired artifacts");
            }
        }
    }

    /// Delete artifacts older than `max_age`. Returns the number deleted.
    pub async fn sweep(&self, max_age: Duration) -> usize {
        let in_flight = self.coordinator.in_flight_filenames();
        let now = SystemTime::now();
        let mut deleted = 0;

        let mut entries = match fs::read_dir(&self.config.videos_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %self.config.videos_dir.display(), error = %e, "Sweep could not list artifacts");
                return 0;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Sweep aborted while listing artifacts");
                    break;
                }
            };

            let filename = entry.file_name().to_string_lossy().to_string();
            if in_flight.contains(&filename) {
                debug!(filename, "Skipping artifact with in-flight generation");
                continue;
            }

            let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    warn!(filename, error = %e, "Could not stat artifact, skipping");
                    continue;
                }
            };

            let age = now.duration_since(modified).unwrap_or_default();
            if age <= max_age {
                continue;
            }

            match fs::remove_file(entry.path()).await {
                Ok(()) => {
                    self.coordinator.evict_filename(&filename);
                    debug!(filename, age_secs = age.as_secs(), "Deleted expired artifact");
                    deleted += 1;
                }
                Err(e) => {
                    // Partial progress is fine; move on to the next file.
                    warn!(filename, error = %e, "Failed to delete expired artifact");
                }
            }
        }

        deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use async_trait::async_trait;
    use chrono::Utc;
    use recap_media::{ClipMediaSource, EncodedOutput, MediaResult, RecapEncoder};
    use recap_models::{ChannelId, Clip, ManifestEntry, RecapKey};

    use crate::store::RecapStore;

    struct FakeSource;

    #[async_trait]
    impl ClipMediaSource for FakeSource {
        async fn resolve(&self, clip: &Clip, _duration: u32) -> MediaResult<std::path::PathBuf> {
            Ok(std::path::PathBuf::from(format!("/clips/{}.mp4", clip.id)))
        }
    }

    struct SlowEncoder;

    #[async_trait]
    impl RecapEncoder for SlowEncoder {
        async fn encode(
            &self,
            _key: &RecapKey,
            entries: &[ManifestEntry],
            _output_path: &Path,
        ) -> MediaResult<EncodedOutput> {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Ok(EncodedOutput {
                size_bytes: 1,
                duration_seconds: entries.iter().map(|e| e.duration_seconds).sum(),
            })
        }
    }

    fn fixture(videos_dir: &Path) -> (Arc<GenerationCoordinator>, RetentionSweeper, EngineConfig) {
        let config = EngineConfig {
            videos_dir: videos_dir.to_path_buf(),
            ..EngineConfig::default()
        };
        let coordinator = Arc::new(GenerationCoordinator::new(
            Arc::new(RecapStore::new()),
            Arc::new(FakeSource),
            Arc::new(SlowEncoder),
            config.clone(),
        ));
        let sweeper = RetentionSweeper::new(coordinator.clone(), config.clone());
        (coordinator, sweeper, config)
    }

    #[tokio::test]
    async fn test_sweep_deletes_old_and_preserves_fresh() {
        let dir = tempfile::TempDir::new().unwrap();
        let (_, sweeper, _) = fixture(dir.path());

        let old = dir.path().join("c1_5min_100.mp4");
        fs::write(&old, b"old").await.unwrap();
        tokio::time::sleep(Duration::from_millis(25)).await;

        // max_age of zero: anything with measurable age is expired; a
        // 24h threshold preserves everything written just now.
        assert_eq!(sweeper.sweep(Duration::from_secs(24 * 3600)).await, 0);
        assert!(old.exists());

        assert_eq!(sweeper.sweep(Duration::ZERO).await, 1);
        assert!(!old.exists());
    }

    #[tokio::test]
    async fn test_sweep_skips_in_flight_artifact() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = EngineConfig {
            videos_dir: dir.path().to_path_buf(),
            ..EngineConfig::default()
        };

        let now = Utc::now();
        let channel = ChannelId::from("c1");
        let store = Arc::new(RecapStore::new());
        store
            .add_clip(
                channel.clone(),
                "IRL",
                "t",
                now - chrono::Duration::seconds(30),
                now - chrono::Duration::seconds(20),
            )
            .await
            .unwrap();
        let coordinator = Arc::new(GenerationCoordinator::new(
            store,
            Arc::new(FakeSource),
            Arc::new(SlowEncoder),
            config.clone(),
        ));
        let sweeper = RetentionSweeper::new(coordinator.clone(), config);

        let key = RecapKey::new(
            channel.clone(),
            0,
            now.timestamp_millis() as u64,
            60_000,
        );
        let guarded = dir.path().join(key.artifact_filename());
        fs::write(&guarded, b"partial").await.unwrap();

        let generation = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.get_or_create(channel, 0, now).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        // In flight: even an expired file survives the sweep
        assert_eq!(sweeper.sweep(Duration::ZERO).await, 0);
        assert!(guarded.exists());

        generation.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_sweep_of_missing_dir_is_harmless() {
        let dir = tempfile::TempDir::new().unwrap();
        let (_, sweeper, _) = fixture(&dir.path().join("nonexistent"));
        assert_eq!(sweeper.sweep(Duration::ZERO).await, 0);
    }
}
