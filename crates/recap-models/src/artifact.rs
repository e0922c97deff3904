//! Recap keys, manifests, and encoded artifacts.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::ChannelId;

/// Hard cap on recap runtime, in milliseconds.
pub const RECAP_BUDGET_MS: u64 = 60_000;

/// Identifies *what* recap is wanted, independent of the exact generation
/// instant.
///
/// `time_bucket` is a coarse quantization of "now" (bucket width chosen by
/// the caller), so requests landing in the same window share one cache
/// entry instead of each minting a unique key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecapKey {
    pub channel_id: ChannelId,
    pub minutes_late: u32,
    pub time_bucket: u64,
}

impl RecapKey {
    /// Build a key for a request arriving at `now_ms` (unix millis) with
    /// the given cache bucket width.
    pub fn new(channel_id: ChannelId, minutes_late: u32, now_ms: u64, bucket_ms: u64) -> Self {
        Self {
            channel_id,
            minutes_late,
            time_bucket: now_ms / bucket_ms.max(1),
        }
    }

    /// Output filename for the artifact this key identifies.
    ///
    /// Format: `{channel_id}_{minutes_late}min_{time_bucket}.mp4`
    pub fn artifact_filename(&self) -> String {
        format!(
            "{}_{}min_{}.mp4",
            self.channel_id, self.minutes_late, self.time_bucket
        )
    }

    /// Collision-free name for the transient concat manifest of one
    /// generation run.
    pub fn manifest_filename(&self) -> String {
        format!(
            "concat_{}_{}min_{}.txt",
            self.channel_id, self.minutes_late, self.time_bucket
        )
    }
}

impl fmt::Display for RecapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}min@{}",
            self.channel_id, self.minutes_late, self.time_bucket
        )
    }
}

/// Unique identifier for a generated artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(pub String);

impl ArtifactId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ArtifactId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of a concat manifest: a resolved media file and how long it
/// plays for. Derived per generation run, never persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub media_path: PathBuf,
    pub duration_seconds: u32,
}

/// A generated recap video plus its metadata.
///
/// Created only on encoder success; immutable; deleted only by the
/// retention sweeper or an operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub key: RecapKey,
    pub file_path: PathBuf,
    pub size_bytes: u64,
    pub duration_seconds: u32,
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    /// Filename component of the artifact path.
    pub fn filename(&self) -> Option<&str> {
        self.file_path.file_name().and_then(|n| n.to_str())
    }
}
