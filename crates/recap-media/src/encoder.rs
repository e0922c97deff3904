//! Recap encoder invoker.
//!
//! Drives one external ffmpeg process per generation: writes a concat
//! manifest under the temp directory, invokes the concat demuxer with the
//! fixed fast/lossy encoding profile, and reports the output size plus the
//! manifest's summed duration.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use recap_models::{ManifestEntry, RecapKey};
use tokio::fs;
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;
use crate::manifest::{remove_manifest, write_manifest};

/// Fixed encoding profile. Quality/speed tradeoff is not configurable per
/// request; these values define the output format.
pub const VIDEO_CODEC: &str = "libx264";
pub const SPEED_PRESET: &str = "ultrafast";
pub const CRF: u8 = 28;
pub const AUDIO_CODEC: &str = "aac";
pub const AUDIO_BITRATE: &str = "128k";

/// What the encoder measured about a finished output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedOutput {
    pub size_bytes: u64,
    pub duration_seconds: u32,
}

/// Contract for producing one recap artifact from a manifest.
///
/// The engine depends on this seam so tests can substitute a fake without
/// an ffmpeg binary present.
#[async_trait]
pub trait RecapEncoder: Send + Sync {
    async fn encode(
        &self,
        key: &RecapKey,
        entries: &[ManifestEntry],
        output_path: &Path,
    ) -> MediaResult<EncodedOutput>;
}

/// Concat-demuxer ffmpeg encoder.
pub struct FfmpegRecapEncoder {
    temp_dir: PathBuf,
    runner: FfmpegRunner,
}

impl FfmpegRecapEncoder {
    /// Create an encoder writing transient manifests under `temp_dir`.
    pub fn new(temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: temp_dir.into(),
            runner: FfmpegRunner::new(),
        }
    }

    /// Kill the encoder process after `secs` seconds and fail the run.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.runner = self.runner.with_timeout(secs);
        self
    }
}

#[async_trait]
impl RecapEncoder for FfmpegRecapEncoder {
    async fn encode(
        &self,
        key: &RecapKey,
        entries: &[ManifestEntry],
        output_path: &Path,
    ) -> MediaResult<EncodedOutput> {
        // Manifest name derives from the key so concurrent generations for
        // distinct keys never collide in temp/.
        let manifest_path = self.temp_dir.join(key.manifest_filename());
        write_manifest(&manifest_path, entries).await?;

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let cmd = FfmpegCommand::new(output_path)
            .input_with_args(
                ["-f", "concat", "-safe", "0"],
                manifest_path.to_string_lossy(),
            )
            .video_codec(VIDEO_CODEC)
            .preset(SPEED_PRESET)
            .crf(CRF)
            .audio_codec(AUDIO_CODEC)
            .audio_bitrate(AUDIO_BITRATE);

        debug!(key = %key, entries = entries.len(), "Invoking recap encoder");
        let run_result = self.runner.run(&cmd).await;

        // The manifest is removed on success and failure alike.
        remove_manifest(&manifest_path).await;
        run_result?;

        let size_bytes = fs::metadata(output_path).await?.len();
        let duration_seconds = entries.iter().map(|e| e.duration_seconds).sum();

        info!(
            key = %key,
            output = %output_path.display(),
            size_bytes,
            duration_seconds,
            "Recap encode complete"
        );

        Ok(EncodedOutput {
            size_bytes,
            duration_seconds,
        })
    }
}
