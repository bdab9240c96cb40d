//! Canonical model - the one shape every historical format is mapped into

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics;

/// One completed workout, reconstructed from whatever data survived
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalSession {
    pub id: String,
    pub completed_at: DateTime<Utc>,
    /// Always derived, never read back as-is from a cache
    pub duration_minutes: Option<u32>,
    pub plan_id: Option<String>,
    pub plan_name: Option<String>,
    pub session_name: Option<String>,
    pub week_number: Option<u32>,
    pub day_number: Option<u32>,
    pub exercises: Vec<CanonicalExercise>,
}

impl CanonicalSession {
    pub fn total_sets(&self) -> usize {
        self.exercises.iter().map(|e| e.logs.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalExercise {
    pub exercise_ref: String,
    pub exercise_name: String,
    pub target_sets: Option<u32>,
    pub target_reps: Option<String>,
    pub logs: Vec<CanonicalSetLog>,
    pub total_volume: f64,
    pub top_set_weight: Option<f64>,
    pub comparison: Option<ProgressionDelta>,
}

impl CanonicalExercise {
    /// Build an exercise with its volume and top set derived from `logs`.
    pub fn new(
        exercise_ref: impl Into<String>,
        exercise_name: impl Into<String>,
        logs: Vec<CanonicalSetLog>,
    ) -> Self {
        let total_volume = metrics::total_volume(&logs);
        let top_set_weight = metrics::top_set_weight(&logs);
        Self {
            exercise_ref: exercise_ref.into(),
            exercise_name: exercise_name.into(),
            target_sets: None,
            target_reps: None,
            logs,
            total_volume,
            top_set_weight,
            comparison: None,
        }
    }

    pub fn with_targets(mut self, sets: Option<u32>, reps: Option<String>) -> Self {
        self.target_sets = sets;
        self.target_reps = reps;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalSetLog {
    pub id: String,
    pub actual_reps: u32,
    pub actual_weight: Option<f64>,
    pub actual_rpe: Option<f64>,
    /// Absent for formats that never recorded per-set times
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Change against the previous occurrence of the same exercise
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressionDelta {
    pub volume_delta: f64,
    /// `None` when either side had no weighted set
    pub top_set_delta: Option<f64>,
}

/// Cheap list-view row, built without joins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalSessionSummary {
    pub id: String,
    pub completed_at: DateTime<Utc>,
    pub week_number: Option<u32>,
    pub day_number: Option<u32>,
    pub plan_name: Option<String>,
    pub session_name: Option<String>,
    pub estimated_calories: Option<f64>,
    pub total_exercises: Option<f64>,
    pub total_sets: Option<f64>,
    pub duration_minutes: Option<f64>,
    pub notes: Option<String>,
    pub exercises: Vec<ExerciseSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSummary {
    pub exercise_name: String,
    pub sets_completed: u32,
    pub total_reps: u32,
    pub max_weight: Option<f64>,
    pub total_volume: f64,
    pub is_cardio: bool,
}

/// Parse a stored timestamp: RFC 3339 first, then the SQL `YYYY-MM-DD HH:MM:SS` form.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| chrono::NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
