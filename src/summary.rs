//! History list builder
//!
//! Maps raw history rows straight into list-view summaries. No related tables
//! are queried; per-exercise aggregates come from each row's own backup
//! payload when it has one.

use serde_json::Value;
use tracing::{debug, warn};

use crate::adapters::{
    detect_container, detect_exercise, flat_rows, nested_sets, ContainerShape, ExerciseShape,
    MalformedRecord,
};
use crate::db::SessionRecord;
use crate::exercises::{self, UNKNOWN_EXERCISE};
use crate::model::{CanonicalExercise, CanonicalSessionSummary, ExerciseSummary};
use crate::sanitize::{first_count, first_number, sanitize_count, sanitize_number};

pub fn build_summaries(rows: &[SessionRecord]) -> Vec<CanonicalSessionSummary> {
    rows.iter().map(build_summary).collect()
}

pub fn build_summary(row: &SessionRecord) -> CanonicalSessionSummary {
    let week_number = sanitize_count(&row.week_number);
    let day_number = sanitize_count(&row.day_number);

    CanonicalSessionSummary {
        id: row.id.clone(),
        completed_at: row.completed_at,
        week_number,
        day_number,
        plan_name: row.plan_name.clone(),
        session_name: display_name(
            row.session_name.as_deref(),
            row.plan_name.as_deref(),
            week_number,
            day_number,
        ),
        estimated_calories: sanitize_number(&row.estimated_calories),
        total_exercises: sanitize_number(&row.total_exercises),
        total_sets: sanitize_number(&row.total_sets),
        duration_minutes: sanitize_number(&row.duration_minutes),
        notes: row.notes.clone(),
        exercises: summarize_payload(&row.exercises_data),
    }
}

/// Human name for a list row.
///
/// Generic "Week N Day M" session names give way to the plan name; if none
/// is available they are shortened to "Workout N.M".
pub fn display_name(
    session_name: Option<&str>,
    plan_name: Option<&str>,
    week: Option<u32>,
    day: Option<u32>,
) -> Option<String> {
    let mut name = session_name?.to_string();

    if name.contains("Week") || name.contains("Day") {
        if let Some(plan) = plan_name.filter(|p| *p != name) {
            name = plan.to_string();
        }
    }
    if name.contains("Week") && name.contains("Day") {
        let week = week.map_or_else(|| "-".to_string(), |w| w.to_string());
        let day = day.map_or_else(|| "-".to_string(), |d| d.to_string());
        name = format!("Workout {week}.{day}");
    }

    Some(name)
}

/// Per-exercise aggregates of a backup payload
pub fn summarize_payload(raw: &Value) -> Vec<ExerciseSummary> {
    let records: Vec<&Value> = match detect_container(raw) {
        ContainerShape::Wrapped(list) | ContainerShape::ExerciseList(list) => list.iter().collect(),
        ContainerShape::Single(record) => vec![record],
        ContainerShape::FlatRows(rows) => {
            return flat_rows::adapt_rows(rows).iter().map(summarize_canonical).collect();
        }
        ContainerShape::Encoded(text) => {
            return match serde_json::from_str::<Value>(text) {
                Ok(inner) if !inner.is_string() => summarize_payload(&inner),
                _ => {
                    debug!("[summary] unreadable encoded payload");
                    Vec::new()
                }
            };
        }
        ContainerShape::Unrecognized => return Vec::new(),
    };

    records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| match summarize_exercise(record) {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!("[summary] skipping exercise record {}: {}", index, e);
                None
            }
        })
        .collect()
}

/// Running totals of one exercise's sets
#[derive(Debug, Default)]
struct SetTotals {
    total_reps: u32,
    max_weight: Option<f64>,
    total_volume: f64,
}

impl SetTotals {
    fn add(&mut self, reps: u32, weight: Option<f64>) {
        self.total_reps = self.total_reps.saturating_add(reps);
        let weight = weight.unwrap_or(0.0);
        self.total_volume += reps as f64 * weight;
        if weight > 0.0 {
            self.max_weight = Some(self.max_weight.map_or(weight, |m| m.max(weight)));
        }
    }

    fn into_summary(self, exercise_name: String, sets_completed: u32) -> ExerciseSummary {
        let is_cardio = exercises::is_cardio_exercise(&exercise_name);
        ExerciseSummary {
            exercise_name,
            sets_completed,
            total_reps: self.total_reps,
            max_weight: self.max_weight,
            total_volume: self.total_volume,
            is_cardio,
        }
    }
}

fn set_count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

fn summarize_exercise(record: &Value) -> Result<ExerciseSummary, MalformedRecord> {
    let mut totals = SetTotals::default();

    let sets_completed = match detect_exercise(record) {
        ExerciseShape::NestedSets(sets) | ExerciseShape::NestedLogs(sets) => {
            let performed = nested_sets::performed_sets(sets);
            for set in &performed {
                totals.add(
                    first_count(set, &["reps", "actual_reps"]).unwrap_or(0),
                    first_number(set, &["weight", "original_weight", "actual_weight"]),
                );
            }
            set_count(performed.len())
        }
        ExerciseShape::ParallelArrays { reps, weights } => {
            let weights = weights.unwrap_or(&[]);
            for (i, rep) in reps.iter().enumerate() {
                totals.add(
                    sanitize_count(rep).unwrap_or(0),
                    weights.get(i).and_then(sanitize_number),
                );
            }
            record
                .get("sets")
                .and_then(sanitize_count)
                .unwrap_or(set_count(reps.len()))
        }
        ExerciseShape::Unrecognized if !record.is_object() => return Err(MalformedRecord::NotAnObject),
        // A planned exercise with nothing logged still shows up in the list
        ExerciseShape::Unrecognized => record.get("sets").and_then(sanitize_count).unwrap_or(0),
    };

    let exercise_name = exercises::name_from_record(record).unwrap_or_else(|| UNKNOWN_EXERCISE.to_string());
    Ok(totals.into_summary(exercise_name, sets_completed))
}

/// Aggregates of an exercise already grouped from flat set rows
fn summarize_canonical(exercise: &CanonicalExercise) -> ExerciseSummary {
    let mut totals = SetTotals::default();
    for log in &exercise.logs {
        totals.add(log.actual_reps, log.actual_weight);
    }
    totals.into_summary(exercise.exercise_name.clone(), set_count(exercise.logs.len()))
}
