//! Nested set adapter
//!
//! Exercise records whose `sets` array holds one object per set, carrying
//! reps / weight / rpe / timestamp directly. The very old variant wraps the
//! performed sets one level deeper in `actual_logs`; those are flattened.
//! Exercise-level `actual_logs` / `logs` arrays map the same way.

use serde_json::Value;

use super::{
    detect_exercise, map_records, records, AdaptContext, ExerciseHeader, ExerciseShape,
    MalformedRecord,
};
use crate::model::{parse_timestamp, CanonicalExercise, CanonicalSetLog};
use crate::sanitize::{first_count, first_number, first_text};

const REPS_KEYS: &[&str] = &["reps", "actual_reps"];
const WEIGHT_KEYS: &[&str] = &["weight", "actual_weight"];
const RPE_KEYS: &[&str] = &["rpe", "actual_rpe"];
const ID_KEYS: &[&str] = &["set_id", "log_id", "id"];

pub fn adapt(raw: &Value, ctx: &AdaptContext) -> Vec<CanonicalExercise> {
    map_records(records(raw), "nested-sets", |index, record| match detect_exercise(record) {
        ExerciseShape::NestedSets(sets) | ExerciseShape::NestedLogs(sets) => {
            Some(map_record(record, sets, index, ctx))
        }
        _ => None,
    })
}

pub(crate) fn map_record(
    record: &Value,
    sets: &[Value],
    index: usize,
    _ctx: &AdaptContext,
) -> Result<CanonicalExercise, MalformedRecord> {
    let header = ExerciseHeader::from_record(record, index);

    let logs: Vec<_> = performed_sets(sets)
        .into_iter()
        .enumerate()
        .map(|(i, set)| map_log(set, &header, i + 1))
        .collect();

    if logs.is_empty() {
        return Err(MalformedRecord::NoSets);
    }

    Ok(CanonicalExercise::new(header.exercise_ref, header.exercise_name, logs)
        .with_targets(header.target_sets, header.target_reps))
}

/// Set objects that record work, with `actual_logs` wrappers flattened
pub(crate) fn performed_sets(sets: &[Value]) -> Vec<&Value> {
    let mut performed = Vec::new();
    for set in sets.iter().filter(|s| s.is_object()) {
        if carries_performance(set) {
            performed.push(set);
        } else if let Some(actual) = set.get("actual_logs").and_then(Value::as_array) {
            performed.extend(actual.iter().filter(|l| l.is_object()));
        }
    }
    performed
}

/// A set object that records work itself rather than wrapping sub-logs
fn carries_performance(set: &Value) -> bool {
    REPS_KEYS.iter().chain(WEIGHT_KEYS).any(|k| set.get(*k).is_some())
}

fn map_log(set: &Value, header: &ExerciseHeader, position: usize) -> CanonicalSetLog {
    CanonicalSetLog {
        id: first_text(set, ID_KEYS).unwrap_or_else(|| header.set_id(position)),
        actual_reps: first_count(set, REPS_KEYS).unwrap_or(0),
        actual_weight: first_number(set, WEIGHT_KEYS),
        actual_rpe: first_number(set, RPE_KEYS),
        completed_at: first_text(set, &["completed_at"]).and_then(|t| parse_timestamp(&t)),
        notes: first_text(set, &["notes"]),
    }
}
