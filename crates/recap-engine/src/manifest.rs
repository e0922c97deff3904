//! Manifest construction under the recap time budget.

use std::path::PathBuf;

use recap_models::{artifact::RECAP_BUDGET_MS, ManifestEntry};

/// Uniform per-clip duration for `n` selected clips.
///
/// The 60-second budget is split evenly with two integer floors:
/// `per_clip_ms = 60000 / n`, then `per_clip_secs = per_clip_ms / 1000`.
/// The total is *not* re-spread after flooring, so actual runtime can be
/// strictly under 60s (n=5 gives 5 x 12 = 60, but n=7 would give 56).
/// This is the defined behavior, not an approximation to correct.
pub fn per_clip_seconds(clip_count: usize) -> u32 {
    debug_assert!(clip_count > 0);
    let per_clip_ms = RECAP_BUDGET_MS / clip_count as u64;
    (per_clip_ms / 1000) as u32
}

/// Map resolved media paths to manifest rows with a uniform duration.
///
/// Row order preserves the input order (selection order, most recent
/// first). Returns the entries and the per-clip duration.
pub fn build(media_paths: Vec<PathBuf>) -> (Vec<ManifestEntry>, u32) {
    let duration_seconds = per_clip_seconds(media_paths.len());
    let entries = media_paths
        .into_iter()
        .map(|media_path| ManifestEntry {
            media_path,
            duration_seconds,
        })
        .collect();
    (entries, duration_seconds)
}
