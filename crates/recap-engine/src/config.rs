//! Engine configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Recap engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Final artifact directory
    pub videos_dir: PathBuf,
    /// Resolved/synthesized clip media directory
    pub clips_dir: PathBuf,
    /// Transient concat manifest directory
    pub temp_dir: PathBuf,
    /// Cache bucket width: requests within one bucket share a key
    pub cache_bucket: Duration,
    /// Maximum time a caller waits on another request's generation
    pub waiter_timeout: Duration,
    /// Retention sweep interval
    pub sweep_interval: Duration,
    /// Maximum artifact age before the sweeper deletes it
    pub artifact_max_age: Duration,
    /// Optional hard limit on one encoder run (kills the process)
    pub encoder_timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            videos_dir: PathBuf::from("videos"),
            clips_dir: PathBuf::from("clips"),
            temp_dir: PathBuf::from("temp"),
            cache_bucket: Duration::from_secs(60),
            waiter_timeout: Duration::from_secs(90),
            sweep_interval: Duration::from_secs(3600),
            artifact_max_age: Duration::from_secs(24 * 3600),
            encoder_timeout: None,
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            videos_dir: std::env::var("VIDEOS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.videos_dir),
            clips_dir: std::env::var("CLIPS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.clips_dir),
            temp_dir: std::env::var("TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.temp_dir),
            cache_bucket: env_secs("CACHE_BUCKET_SECS", defaults.cache_bucket),
            waiter_timeout: env_secs("WAITER_TIMEOUT_SECS", defaults.waiter_timeout),
            sweep_interval: env_secs("SWEEP_INTERVAL_SECS", defaults.sweep_interval),
            artifact_max_age: env_secs("ARTIFACT_MAX_AGE_SECS", defaults.artifact_max_age),
            encoder_timeout: std::env::var("ENCODER_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs),
        }
    }

    /// Cache bucket width in milliseconds, for key construction.
    pub fn cache_bucket_ms(&self) -> u64 {
        self.cache_bucket.as_millis().max(1) as u64
    }

    /// Create the artifact storage directories if absent.
    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.videos_dir).await?;
        tokio::fs::create_dir_all(&self.clips_dir).await?;
        tokio::fs::create_dir_all(&self.temp_dir).await?;
        Ok(())
    }
}

fn env_secs(var: &str, default: Duration) -> Duration {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}
