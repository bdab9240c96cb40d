//! Exercise naming rules shared by the adapters and the list builder

use serde_json::Value;

use crate::sanitize::sanitize_text;

/// Name used when neither the payload nor the catalog knows the exercise
pub const UNKNOWN_EXERCISE: &str = "Unknown Exercise";

/// Plan name used in placeholder notes when the plan left no trace
pub const UNKNOWN_PLAN: &str = "Unknown Plan";

/// Prefix of ids invented for records that carried none
pub const SYNTHETIC_PREFIX: &str = "synthetic-";

/// Keywords marking conditioning work in the list view
const CARDIO_KEYWORDS: &[&str] = &[
    "jump", "burpee", "running", "sprint", "hiit", "interval", "rope", "mountain", "climber",
    "jack", "knee", "kicker", "bound", "crawl", "star", "battle", "swing", "slam", "shuttle",
    "fartlek", "swimming", "dance", "dancing", "step", "stair", "climb", "cardio",
];

/// A name made only of digits is a leaked array index, not a name.
pub fn is_index_like(name: &str) -> bool {
    let trimmed = name.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit())
}

/// Accept a candidate name only if it is real text.
pub fn clean_name(candidate: &str) -> Option<String> {
    let trimmed = candidate.trim();
    if trimmed.is_empty() || is_index_like(trimmed) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Name carried by an exercise record, if any.
///
/// Looks at `exercise_name`, `name`, then the joined `exercises.name`.
pub fn name_from_record(record: &Value) -> Option<String> {
    let joined = record.get("exercises").and_then(|e| e.get("name"));
    [record.get("exercise_name"), record.get("name"), joined]
        .into_iter()
        .flatten()
        .filter_map(|v| v.as_str())
        .find_map(clean_name)
}

/// Exercise reference carried by a record, if any.
pub fn ref_from_record(record: &Value) -> Option<String> {
    ["exercise_id", "id"]
        .iter()
        .find_map(|k| record.get(*k).and_then(sanitize_text))
}

pub fn synthetic_id(kind: &str, suffix: impl std::fmt::Display) -> String {
    format!("{SYNTHETIC_PREFIX}{kind}-{suffix}")
}

pub fn is_synthetic(id: &str) -> bool {
    id.starts_with(SYNTHETIC_PREFIX)
}

pub fn is_cardio_exercise(name: &str) -> bool {
    let lower = name.to_lowercase();
    CARDIO_KEYWORDS.iter().any(|k| lower.contains(k))
}
