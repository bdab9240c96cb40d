//! Shape adapters - historical exercise payloads into the canonical model
//!
//! Every stored shape gets its own adapter. Detection runs once per payload
//! ([`detect_container`]) and once per exercise record ([`detect_exercise`]);
//! mappers only ever see an already classified variant.
//!
//! All adapters are pure: the session resolver calls them speculatively and
//! keeps a result only when it is non-empty.

pub mod backup;
pub mod flat_rows;
pub mod legacy_array;
pub mod nested_sets;

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::exercises::{self, UNKNOWN_EXERCISE};
use crate::model::CanonicalExercise;
use crate::sanitize::{first_count, first_text};

/// Session-level facts an adapter may need but cannot look up itself
#[derive(Debug, Clone, Copy)]
pub struct AdaptContext {
    /// Completion time of the owning session, anchor for synthesized set times
    pub completed_at: DateTime<Utc>,
}

impl AdaptContext {
    pub fn new(completed_at: DateTime<Utc>) -> Self {
        Self { completed_at }
    }
}

/// A single exercise or set record that could not be mapped
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MalformedRecord {
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("record has no recognizable set data")]
    UnknownShape,
    #[error("record has no usable sets")]
    NoSets,
    #[error("set row carries no exercise reference")]
    MissingExerciseRef,
}

/// Outer container of a stored exercise payload
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContainerShape<'a> {
    /// `{ "exercises": [...] }`
    Wrapped(&'a [Value]),
    /// `[ {exercise}, ... ]`
    ExerciseList(&'a [Value]),
    /// `[ {exercise_id, actual_reps, ...}, ... ]`, one row per set
    FlatRows(&'a [Value]),
    /// `{ exercise }`
    Single(&'a Value),
    /// The whole payload stored as a JSON string
    Encoded(&'a str),
    Unrecognized,
}

/// How one exercise record stores its sets
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExerciseShape<'a> {
    /// `sets: [ {reps, weight, ...} | {actual_logs: [...]} ]`
    NestedSets(&'a [Value]),
    /// `actual_logs: [...]` or `logs: [...]` directly on the exercise
    NestedLogs(&'a [Value]),
    /// `reps: [...]`, `weights: [...]`, no per-set timestamps
    ParallelArrays {
        reps: &'a [Value],
        weights: Option<&'a [Value]>,
    },
    Unrecognized,
}

fn non_empty_array<'a>(record: &'a Value, key: &str) -> Option<&'a [Value]> {
    record
        .get(key)
        .and_then(Value::as_array)
        .filter(|a| !a.is_empty())
        .map(Vec::as_slice)
}

pub fn looks_like_flat_row(value: &Value) -> bool {
    value.get("exercise_id").is_some_and(|v| !v.is_null()) && value.get("actual_reps").is_some()
}

pub fn detect_container(raw: &Value) -> ContainerShape<'_> {
    match raw {
        Value::Array(items) if items.is_empty() => ContainerShape::Unrecognized,
        Value::Array(items) if looks_like_flat_row(&items[0]) => ContainerShape::FlatRows(items),
        Value::Array(items) => ContainerShape::ExerciseList(items),
        Value::Object(map) => {
            if let Some(list) = map.get("exercises").and_then(Value::as_array) {
                ContainerShape::Wrapped(list)
            } else if ["exercise_id", "exercise_name", "name", "id"]
                .iter()
                .any(|k| map.get(*k).is_some_and(|v| !v.is_null()))
            {
                ContainerShape::Single(raw)
            } else {
                ContainerShape::Unrecognized
            }
        }
        Value::String(s) if !s.trim().is_empty() => ContainerShape::Encoded(s),
        _ => ContainerShape::Unrecognized,
    }
}

pub fn detect_exercise(record: &Value) -> ExerciseShape<'_> {
    if !record.is_object() {
        return ExerciseShape::Unrecognized;
    }
    if let Some(sets) = non_empty_array(record, "sets") {
        return ExerciseShape::NestedSets(sets);
    }
    if let Some(logs) = non_empty_array(record, "actual_logs").or_else(|| non_empty_array(record, "logs")) {
        return ExerciseShape::NestedLogs(logs);
    }
    if let Some(reps) = non_empty_array(record, "reps") {
        let weights = record.get("weights").and_then(Value::as_array).map(Vec::as_slice);
        return ExerciseShape::ParallelArrays { reps, weights };
    }
    ExerciseShape::Unrecognized
}

/// Identity and plan targets of one exercise record
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ExerciseHeader {
    pub exercise_ref: String,
    pub exercise_name: String,
    pub target_sets: Option<u32>,
    pub target_reps: Option<String>,
}

impl ExerciseHeader {
    pub fn from_record(record: &Value, index: usize) -> Self {
        Self {
            exercise_ref: exercises::ref_from_record(record)
                .unwrap_or_else(|| exercises::synthetic_id("exercise", index)),
            exercise_name: exercises::name_from_record(record)
                .unwrap_or_else(|| UNKNOWN_EXERCISE.to_string()),
            target_sets: first_count(record, &["target_sets"]),
            target_reps: first_text(record, &["target_reps"]),
        }
    }

    pub fn set_id(&self, position: usize) -> String {
        exercises::synthetic_id("set", format!("{}-{}", self.exercise_ref, position))
    }
}

/// Top-level records of a payload: the items of an array, or the value itself.
pub(crate) fn records(raw: &Value) -> Vec<&Value> {
    match raw {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => vec![raw],
        _ => Vec::new(),
    }
}

/// Map each record, logging and skipping the ones that fail.
pub(crate) fn map_records<'a, F>(
    records: impl IntoIterator<Item = &'a Value>,
    adapter: &str,
    mut map: F,
) -> Vec<CanonicalExercise>
where
    F: FnMut(usize, &'a Value) -> Option<Result<CanonicalExercise, MalformedRecord>>,
{
    let mut exercises = Vec::new();
    for (index, record) in records.into_iter().enumerate() {
        match map(index, record) {
            Some(Ok(exercise)) => exercises.push(exercise),
            Some(Err(MalformedRecord::NoSets)) => {
                debug!("[{}] skipping exercise record {} without sets", adapter, index);
            }
            Some(Err(e)) => {
                warn!("[{}] skipping malformed exercise record {}: {}", adapter, index, e);
            }
            None => {
                debug!("[{}] record {} belongs to another shape", adapter, index);
            }
        }
    }
    exercises
}
