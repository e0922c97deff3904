//! Application state.

use std::sync::Arc;

use recap_engine::{EngineConfig, GenerationCoordinator, RecapStore};
use recap_media::{FfmpegRecapEncoder, PlaceholderMediaSource};

use crate::config::ApiConfig;

/// Shared application state.
///
/// Created once at startup; nothing here persists across restarts.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub engine_config: EngineConfig,
    pub store: Arc<RecapStore>,
    pub coordinator: Arc<GenerationCoordinator>,
}

impl AppState {
    /// Create new application state with the shipped placeholder media
    /// source and the ffmpeg encoder.
    pub fn new(config: ApiConfig, engine_config: EngineConfig) -> Self {
        let store = Arc::new(RecapStore::new());

        let media = Arc::new(PlaceholderMediaSource::new(&engine_config.clips_dir));
        let mut encoder = FfmpegRecapEncoder::new(&engine_config.temp_dir);
        if let Some(timeout) = engine_config.encoder_timeout {
            encoder = encoder.with_timeout(timeout.as_secs());
        }

        let coordinator = Arc::new(GenerationCoordinator::new(
            store.clone(),
            media,
            Arc::new(encoder),
            engine_config.clone(),
        ));

        Self {
            config,
            engine_config,
            store,
            coordinator,
        }
    }
}
