//! Session duration inference
//!
//! Source systems rarely stored a duration, so it is derived from the best
//! evidence available, in this order:
//! 1. the persisted value
//! 2. the span between the earliest and latest set timestamps
//! 3. a single timestamp, counted as one minute
//! 4. one minute per logged set when no timestamps exist (rough estimate)

use std::collections::BTreeSet;

use crate::model::CanonicalSetLog;

/// Derive a session duration in minutes, `None` when there is no evidence at all.
pub fn infer_duration<'a, I>(stored: Option<u32>, exercises: I) -> Option<u32>
where
    I: IntoIterator<Item = &'a [CanonicalSetLog]>,
{
    if stored.is_some() {
        return stored;
    }

    let mut timestamps = BTreeSet::new();
    let mut set_count: u32 = 0;
    for logs in exercises {
        for log in logs {
            set_count = set_count.saturating_add(1);
            if let Some(at) = log.completed_at {
                timestamps.insert(at);
            }
        }
    }

    match (timestamps.first(), timestamps.last()) {
        (Some(first), Some(last)) if timestamps.len() >= 2 => {
            let secs = (*last - *first).num_seconds() as f64;
            let minutes = (secs / 60.0).round() as u32;
            Some(minutes.max(1))
        }
        (Some(_), _) => Some(1),
        _ if set_count > 0 => Some(set_count.max(1)),
        _ => None,
    }
}
