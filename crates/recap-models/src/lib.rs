//! Shared data models for the stream recap service.
//!
//! This crate provides Serde-serializable types for:
//! - Stream sessions and their category segments
//! - Clips captured during a broadcast
//! - Recap generation keys and encoded artifacts

pub mod artifact;
pub mod clip;
pub mod session;

// Re-export common types
pub use artifact::{Artifact, ArtifactId, ManifestEntry, RecapKey};
pub use clip::{Clip, ClipId};
pub use session::{ChannelId, StreamSession};
