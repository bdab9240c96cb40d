//! Flat exercise-set adapter
//!
//! Relational shape: one row per performed set, each tagged with the exercise
//! it belongs to. Unlike the other adapters this one aggregates: rows are
//! grouped by exercise reference, groups keep the order in which each
//! exercise first appears, and sets keep row order within a group.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::warn;

use super::{AdaptContext, MalformedRecord};
use crate::exercises::{self, UNKNOWN_EXERCISE};
use crate::model::{parse_timestamp, CanonicalExercise, CanonicalSetLog};
use crate::sanitize::{first_count, first_number, first_text};

/// One performed set, already tagged with its exercise
#[derive(Debug, Clone, PartialEq)]
pub struct FlatSetRow {
    pub id: Option<String>,
    pub exercise_ref: String,
    pub exercise_name: Option<String>,
    pub reps: u32,
    pub weight: Option<f64>,
    pub rpe: Option<f64>,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub target_sets: Option<u32>,
    pub target_reps: Option<String>,
}

impl FlatSetRow {
    pub fn from_value(row: &Value) -> Result<Self, MalformedRecord> {
        if !row.is_object() {
            return Err(MalformedRecord::NotAnObject);
        }
        let exercise_ref =
            first_text(row, &["exercise_id"]).ok_or(MalformedRecord::MissingExerciseRef)?;

        Ok(Self {
            id: first_text(row, &["id", "set_id", "log_id"]),
            exercise_ref,
            exercise_name: exercises::name_from_record(row),
            reps: first_count(row, &["actual_reps", "reps"]).unwrap_or(0),
            weight: first_number(row, &["actual_weight", "weight"]),
            rpe: first_number(row, &["actual_rpe", "rpe"]),
            completed_at: first_text(row, &["completed_at"]).and_then(|t| parse_timestamp(&t)),
            notes: first_text(row, &["notes"]),
            target_sets: first_count(row, &["target_sets"]),
            target_reps: first_text(row, &["target_reps"]),
        })
    }
}

pub fn adapt(raw: &Value, _ctx: &AdaptContext) -> Vec<CanonicalExercise> {
    match raw.as_array() {
        Some(items) => adapt_rows(items),
        None => Vec::new(),
    }
}

/// Parse raw rows, skipping the malformed ones, then group them.
pub(crate) fn adapt_rows(items: &[Value]) -> Vec<CanonicalExercise> {
    let rows = items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match FlatSetRow::from_value(item) {
            Ok(row) => Some(row),
            Err(e) => {
                warn!("[flat-rows] skipping set row {}: {}", index, e);
                None
            }
        })
        .collect();
    group_rows(rows)
}

struct Group {
    exercise_ref: String,
    exercise_name: Option<String>,
    target_sets: Option<u32>,
    target_reps: Option<String>,
    logs: Vec<CanonicalSetLog>,
}

pub fn group_rows(rows: Vec<FlatSetRow>) -> Vec<CanonicalExercise> {
    let mut groups: Vec<Group> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let slot = *index.entry(row.exercise_ref.clone()).or_insert_with(|| {
            groups.push(Group {
                exercise_ref: row.exercise_ref.clone(),
                exercise_name: None,
                target_sets: None,
                target_reps: None,
                logs: Vec::new(),
            });
            groups.len() - 1
        });
        let group = &mut groups[slot];

        if group.exercise_name.is_none() {
            group.exercise_name = row.exercise_name;
        }
        group.target_sets = group.target_sets.or(row.target_sets);
        if group.target_reps.is_none() {
            group.target_reps = row.target_reps;
        }

        let position = group.logs.len() + 1;
        let id = row.id.unwrap_or_else(|| {
            exercises::synthetic_id("set", format!("{}-{}", group.exercise_ref, position))
        });
        group.logs.push(CanonicalSetLog {
            id,
            actual_reps: row.reps,
            actual_weight: row.weight,
            actual_rpe: row.rpe,
            completed_at: row.completed_at,
            notes: row.notes,
        });
    }

    groups
        .into_iter()
        .map(|g| {
            let name = g.exercise_name.unwrap_or_else(|| UNKNOWN_EXERCISE.to_string());
            CanonicalExercise::new(g.exercise_ref, name, g.logs)
                .with_targets(g.target_sets, g.target_reps)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn ctx() -> AdaptContext {
        AdaptContext::new(Utc.with_ymd_and_hms(2024, 4, 1, 7, 0, 0).unwrap())
    }

    fn row(id: &str, exercise: &str, reps: u32, weight: f64) -> Value {
        json!({"id": id, "exercise_id": exercise, "actual_reps": reps, "actual_weight": weight})
    }

    #[test]
    fn test_groups_by_exercise_in_row_order() {
        let raw = json!([
            row("r1", "A", 10, 50.0),
            row("r2", "B", 8, 20.0),
            row("r3", "A", 9, 50.0),
            row("r4", "B", 8, 22.5),
            row("r5", "A", 8, 55.0),
        ]);
        let exercises = adapt(&raw, &ctx());

        assert_eq!(exercises.len(), 2);
        assert_eq!(exercises[0].exercise_ref, "A");
        assert_eq!(exercises[1].exercise_ref, "B");

        let a_ids: Vec<_> = exercises[0].logs.iter().map(|l| l.id.as_str()).collect();
        let b_ids: Vec<_> = exercises[1].logs.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(a_ids, vec!["r1", "r3", "r5"]);
        assert_eq!(b_ids, vec!["r2", "r4"]);
    }

    #[test]
    fn test_name_from_any_row_of_the_group() {
        let raw = json!([
            {"id": "r1", "exercise_id": "A", "actual_reps": 5},
            {"id": "r2", "exercise_id": "A", "actual_reps": 5, "exercises": {"name": "Pull Up"}},
            {"id": "r3", "exercise_id": "C", "actual_reps": 5, "exercise_name": "99"},
        ]);
        let exercises = adapt(&raw, &ctx());
        assert_eq!(exercises[0].exercise_name, "Pull Up");
        assert_eq!(exercises[1].exercise_name, UNKNOWN_EXERCISE);
    }

    #[test]
    fn test_rows_without_reference_are_skipped() {
        let raw = json!([
            {"id": "r1", "actual_reps": 5},
            "junk",
            row("r2", "A", 5, 40.0),
        ]);
        let exercises = adapt(&raw, &ctx());
        assert_eq!(exercises.len(), 1);
        assert_eq!(exercises[0].logs.len(), 1);
        assert_eq!(exercises[0].total_volume, 200.0);
    }

    #[test]
    fn test_garbage_yields_nothing() {
        assert!(adapt(&json!(null), &ctx()).is_empty());
        assert!(adapt(&json!({"exercise_id": "A"}), &ctx()).is_empty());
        assert!(adapt(&json!([1, 2, 3]), &ctx()).is_empty());
    }
}
