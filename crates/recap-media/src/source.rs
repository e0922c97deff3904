//! Clip media resolution.
//!
//! Real clip media retrieval from the broadcast platform is out of scope;
//! the [`ClipMediaSource`] trait is the swap point for a true fetcher.
//! The shipped implementation synthesizes placeholder media (blank frame
//! plus tone) and caches it at the clip's canonical path.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use recap_models::Clip;
use tokio::fs;
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::encoder::{AUDIO_BITRATE, AUDIO_CODEC, CRF, SPEED_PRESET, VIDEO_CODEC};
use crate::error::{MediaError, MediaResult};

/// Placeholder frame geometry.
const PLACEHOLDER_SIZE: &str = "1280x720";

/// Placeholder frame color.
const PLACEHOLDER_COLOR: &str = "0x1f1f2e";

/// Placeholder tone frequency in Hz.
const PLACEHOLDER_TONE_HZ: u32 = 440;

/// Resolves a clip to a playable media file of the requested duration.
#[async_trait]
pub trait ClipMediaSource: Send + Sync {
    /// Return a path to media for `clip`, exactly `duration_seconds` long.
    ///
    /// Fails with [`MediaError::MediaUnavailable`] only when no media can
    /// be produced at all.
    async fn resolve(&self, clip: &Clip, duration_seconds: u32) -> MediaResult<PathBuf>;
}

/// Media source that synthesizes silent/blank placeholder clips.
pub struct PlaceholderMediaSource {
    clips_dir: PathBuf,
    runner: FfmpegRunner,
}

impl PlaceholderMediaSource {
    /// Create a source caching synthesized media under `clips_dir`.
    pub fn new(clips_dir: impl Into<PathBuf>) -> Self {
        Self {
            clips_dir: clips_dir.into(),
            runner: FfmpegRunner::new(),
        }
    }

    /// Canonical cache path for a clip's media.
    pub fn media_path(&self, clip: &Clip) -> PathBuf {
        self.clips_dir.join(format!("{}.mp4", clip.id))
    }

    async fn synthesize(&self, path: &Path, duration_seconds: u32) -> MediaResult<()> {
        fs::create_dir_all(&self.clips_dir).await?;

        // Blank color frame + fixed-frequency tone, trimmed to the exact
        // requested duration, encoded with the recap output profile.
        let cmd = FfmpegCommand::new(path)
            .input_with_args(
                ["-f", "lavfi"],
                format!(
                    "color=c={}:s={}:d={}",
                    PLACEHOLDER_COLOR, PLACEHOLDER_SIZE, duration_seconds
                ),
            )
            .input_with_args(
                ["-f", "lavfi"],
                format!(
                    "sine=frequency={}:duration={}",
                    PLACEHOLDER_TONE_HZ, duration_seconds
                ),
            )
            .video_codec(VIDEO_CODEC)
            .preset(SPEED_PRESET)
            .crf(CRF)
            .audio_codec(AUDIO_CODEC)
            .audio_bitrate(AUDIO_BITRATE)
            .duration(duration_seconds);

        self.runner.run(&cmd).await
    }
}

#[async_trait]
impl ClipMediaSource for PlaceholderMediaSource {
    async fn resolve(&self, clip: &Clip, duration_seconds: u32) -> MediaResult<PathBuf> {
        let path = self.media_path(clip);

        // Reuse previously synthesized media for the same clip id.
        if fs::try_exists(&path).await.unwrap_or(false) {
            debug!(clip_id = %clip.id, path = %path.display(), "Clip media cache hit");
            return Ok(path);
        }

        info!(
            clip_id = %clip.id,
            duration_seconds,
            "Clip media missing, synthesizing placeholder"
        );

        self.synthesize(&path, duration_seconds)
            .await
            .map_err(|e| MediaError::unavailable(clip.id.as_str(), e.to_string()))?;

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use recap_models::ChannelId;

    fn clip() -> Clip {
        let now = Utc::now();
        Clip::new(
            ChannelId::from("c1"),
            "Minecraft",
            "wow",
            now - chrono::Duration::seconds(30),
            now,
        )
        .unwrap()
    }

    #[test]
    fn test_media_path_is_keyed_by_clip_id() {
        let source = PlaceholderMediaSource::new("/data/clips");
        let clip = clip();
        assert_eq!(
            source.media_path(&clip),
            PathBuf::from(format!("/data/clips/{}.mp4", clip.id))
        );
    }

    #[tokio::test]
    async fn test_resolve_returns_cached_media_without_synthesis() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = PlaceholderMediaSource::new(dir.path());
        let clip = clip();

        // Pre-seed the canonical path; resolve must return it untouched
        // (no ffmpeg needed).
        let path = source.media_path(&clip);
        fs::write(&path, b"fake media").await.unwrap();

        let resolved = source.resolve(&clip, 20).await.unwrap();
        assert_eq!(resolved, path);
        assert_eq!(fs::read(&resolved).await.unwrap(), b"fake media");
    }
}
