//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while driving ffmpeg or resolving clip media.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("Encoding failed with exit code {exit_code:?}")]
    EncodingFailed {
        exit_code: Option<i32>,
        stderr: Option<String>,
    },

    #[error("Media unavailable for clip {clip_id}: {reason}")]
    MediaUnavailable { clip_id: String, reason: String },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Encoder timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Create an encoding failure error.
    pub fn encoding_failed(exit_code: Option<i32>, stderr: Option<String>) -> Self {
        Self::EncodingFailed { exit_code, stderr }
    }

    /// Create a media-unavailable error.
    pub fn unavailable(clip_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MediaUnavailable {
            clip_id: clip_id.into(),
            reason: reason.into(),
        }
    }

    /// The external process exit code, when the error carries one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::EncodingFailed { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}
