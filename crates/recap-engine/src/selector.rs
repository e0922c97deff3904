//! Clip selection for a recap.

use chrono::{DateTime, Duration, Utc};
use recap_models::Clip;

use crate::error::{EngineError, EngineResult};

/// At most this many clips enter one recap.
pub const MAX_RECAP_CLIPS: usize = 5;

/// Choose the clips that enter a recap for a viewer `minutes_late` minutes
/// behind the live edge.
///
/// The cutoff is `now - minutes_late * 60_000 ms`; only clips that start
/// strictly before it qualify (they had already happened when the viewer
/// tuned in). The most recent qualifying clips win, newest first, capped
/// at [`MAX_RECAP_CLIPS`]. Deterministic for identical inputs.
pub fn select(
    clips: &[Clip],
    minutes_late: u32,
    now: DateTime<Utc>,
) -> EngineResult<Vec<Clip>> {
    if clips.is_empty() {
        return Err(EngineError::NoClips);
    }

    let cutoff = now - Duration::milliseconds(i64::from(minutes_late) * 60_000);

    let mut relevant: Vec<Clip> = clips
        .iter()
        .filter(|c| c.start_time < cutoff)
        .cloned()
        .collect();

    if relevant.is_empty() {
        return Err(EngineError::NoRelevantClips);
    }

    relevant.sort_by(|a, b| b.start_time.cmp(&a.start_time));
    relevant.truncate(MAX_RECAP_CLIPS);
    Ok(relevant)
}
