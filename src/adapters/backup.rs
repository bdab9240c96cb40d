//! JSON backup adapter
//!
//! Denormalized `exercises_data` snapshots saved next to each completed
//! workout. The container varies (wrapped under `exercises`, a bare array, a
//! single exercise object, occasionally the whole thing stored as a string)
//! and so does each exercise inside it. The container is classified first,
//! then every record is handed to the adapter matching its own shape.

use serde_json::Value;
use tracing::{debug, warn};

use super::{
    detect_container, detect_exercise, flat_rows, legacy_array, map_records, nested_sets,
    AdaptContext, ContainerShape, ExerciseShape, MalformedRecord,
};
use crate::model::CanonicalExercise;

pub fn adapt(raw: &Value, ctx: &AdaptContext) -> Vec<CanonicalExercise> {
    match detect_container(raw) {
        ContainerShape::Wrapped(list) | ContainerShape::ExerciseList(list) => {
            adapt_exercises(list.iter(), ctx)
        }
        ContainerShape::Single(record) => adapt_exercises(std::iter::once(record), ctx),
        ContainerShape::FlatRows(rows) => flat_rows::adapt_rows(rows),
        ContainerShape::Encoded(text) => match serde_json::from_str::<Value>(text) {
            // Only one level of string encoding is unwrapped
            Ok(inner) if !inner.is_string() => adapt(&inner, ctx),
            Ok(_) => {
                warn!("[backup] doubly encoded exercise payload ignored");
                Vec::new()
            }
            Err(e) => {
                warn!("[backup] exercise payload string is not JSON: {}", e);
                Vec::new()
            }
        },
        ContainerShape::Unrecognized => {
            debug!("[backup] unrecognized exercise payload container");
            Vec::new()
        }
    }
}

fn adapt_exercises<'a>(
    records: impl IntoIterator<Item = &'a Value>,
    ctx: &AdaptContext,
) -> Vec<CanonicalExercise> {
    map_records(records, "backup", |index, record| {
        Some(match detect_exercise(record) {
            ExerciseShape::NestedSets(sets) | ExerciseShape::NestedLogs(sets) => {
                nested_sets::map_record(record, sets, index, ctx)
            }
            ExerciseShape::ParallelArrays { reps, weights } => {
                legacy_array::map_record(record, reps, weights, index, ctx)
            }
            ExerciseShape::Unrecognized if record.is_object() => Err(MalformedRecord::UnknownShape),
            ExerciseShape::Unrecognized => Err(MalformedRecord::NotAnObject),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn ctx() -> AdaptContext {
        AdaptContext::new(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap())
    }

    #[test]
    fn test_wrapped_mixed_shapes() {
        let raw = json!({
            "version": 3,
            "exercises": [
                {"exercise_id": "ex-1", "exercise_name": "Squat", "sets": [{"reps": 5, "weight": 100}]},
                {"name": "Curl", "sets": 2, "reps": [12, 10], "weights": [15, 15]},
                {"exercise_id": "ex-3", "name": "Press", "actual_logs": [{"actual_reps": 6, "actual_weight": 50}]}
            ]
        });
        let exercises = adapt(&raw, &ctx());

        let names: Vec<_> = exercises.iter().map(|e| e.exercise_name.as_str()).collect();
        assert_eq!(names, vec!["Squat", "Curl", "Press"]);
        assert_eq!(exercises[1].total_volume, 330.0);
    }

    #[test]
    fn test_single_exercise_object() {
        let raw = json!({"name": "Bench Press", "sets": 3, "reps": [10, 8, 6], "weights": [60, 70, 80]});
        let exercises = adapt(&raw, &ctx());
        assert_eq!(exercises.len(), 1);
        assert_eq!(exercises[0].total_volume, 1640.0);
    }

    #[test]
    fn test_bare_flat_rows() {
        let raw = json!([
            {"id": "r1", "exercise_id": "A", "actual_reps": 10, "actual_weight": 20},
            {"id": "r2", "exercise_id": "A", "actual_reps": 10, "actual_weight": 20}
        ]);
        let exercises = adapt(&raw, &ctx());
        assert_eq!(exercises.len(), 1);
        assert_eq!(exercises[0].logs.len(), 2);
    }

    #[test]
    fn test_string_encoded_payload() {
        let inner = json!([{"name": "Row", "sets": [{"reps": 8, "weight": 40}]}]);
        let raw = Value::String(inner.to_string());
        let exercises = adapt(&raw, &ctx());
        assert_eq!(exercises.len(), 1);
        assert_eq!(exercises[0].exercise_name, "Row");

        let doubly = Value::String(raw.to_string());
        assert!(adapt(&doubly, &ctx()).is_empty());
    }

    #[test]
    fn test_one_bad_record_is_skipped() {
        let raw = json!([
            "not an exercise",
            {"name": "Mystery"},
            {"name": "Dip", "sets": [{"reps": 12}]}
        ]);
        let exercises = adapt(&raw, &ctx());
        assert_eq!(exercises.len(), 1);
        assert_eq!(exercises[0].exercise_name, "Dip");
    }

    #[test]
    fn test_garbage_yields_nothing() {
        for raw in [json!(null), json!(3), json!("{oops"), json!({}), json!([]), json!({"exercises": "x"})] {
            assert!(adapt(&raw, &ctx()).is_empty(), "payload {raw} should map to nothing");
        }
    }
}
