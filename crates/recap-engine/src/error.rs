//! Engine error types.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by the recap engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No clips recorded for this channel")]
    NoClips,

    #[error("No clips before the requested cutoff")]
    NoRelevantClips,

    #[error("Timed out waiting for recap generation")]
    Timeout,

    #[error("Recap generation failed: {0}")]
    Generation(String),

    #[error(transparent)]
    Media(#[from] recap_media::MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
