//! Legacy parallel-array adapter
//!
//! Oldest standalone-workout format: one record per exercise with `reps[]`
//! and `weights[]` side by side and no per-set times. Set times are
//! synthesized backwards from the session completion, one minute per set,
//! the last set landing exactly on the completion time. That spacing is an
//! approximation kept for compatibility with existing history screens; no
//! other format uses it.

use chrono::Duration;
use serde_json::Value;

use super::{
    detect_exercise, map_records, records, AdaptContext, ExerciseHeader, ExerciseShape,
    MalformedRecord,
};
use crate::model::{CanonicalExercise, CanonicalSetLog};
use crate::sanitize::{first_count, sanitize_count, sanitize_number};

/// Minutes between synthesized set timestamps
const SYNTHETIC_SET_SPACING_MINUTES: i64 = 1;

pub fn adapt(raw: &Value, ctx: &AdaptContext) -> Vec<CanonicalExercise> {
    map_records(records(raw), "legacy-array", |index, record| match detect_exercise(record) {
        ExerciseShape::ParallelArrays { reps, weights } => {
            Some(map_record(record, reps, weights, index, ctx))
        }
        _ => None,
    })
}

pub(crate) fn map_record(
    record: &Value,
    reps: &[Value],
    weights: Option<&[Value]>,
    index: usize,
    ctx: &AdaptContext,
) -> Result<CanonicalExercise, MalformedRecord> {
    if reps.is_empty() {
        return Err(MalformedRecord::NoSets);
    }

    let header = ExerciseHeader::from_record(record, index);
    let count = reps.len();

    let logs = reps
        .iter()
        .enumerate()
        .map(|(i, rep)| {
            let steps_back = (count - 1 - i) as i64 * SYNTHETIC_SET_SPACING_MINUTES;
            CanonicalSetLog {
                id: header.set_id(i + 1),
                actual_reps: sanitize_count(rep).unwrap_or(0),
                actual_weight: weights
                    .and_then(|w| w.get(i))
                    .and_then(sanitize_number),
                actual_rpe: None,
                completed_at: Some(ctx.completed_at - Duration::minutes(steps_back)),
                notes: None,
            }
        })
        .collect();

    // `sets` is a plain count in this format; treat it as the planned target
    let target_sets = header.target_sets.or_else(|| first_count(record, &["sets"]));

    Ok(CanonicalExercise::new(header.exercise_ref, header.exercise_name, logs)
        .with_targets(target_sets, header.target_reps))
}
