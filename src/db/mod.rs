//! Database module - store contract and the records it hands out
//!
//! The engine only talks to a [`HistoryStore`]; [`Database`] is the SQLite
//! implementation used by the CLI and the tests.

mod sqlite;

pub use sqlite::Database;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Completed workout row as persisted.
///
/// Numeric columns stay raw: years of schema drift left strings and
/// corrupted values in them, so they are sanitized on read by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub plan_id: Option<String>,
    /// Planned session this history row was completed from, if it still exists
    #[serde(default)]
    pub session_ref: Option<String>,
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub week_number: Value,
    #[serde(default)]
    pub day_number: Value,
    #[serde(default)]
    pub plan_name: Option<String>,
    #[serde(default)]
    pub session_name: Option<String>,
    #[serde(default)]
    pub duration_minutes: Value,
    #[serde(default)]
    pub total_sets: Value,
    #[serde(default)]
    pub total_exercises: Value,
    #[serde(default)]
    pub estimated_calories: Value,
    #[serde(default)]
    pub notes: Option<String>,
    /// Denormalized exercise snapshot, in whichever shape was current when saved
    #[serde(default)]
    pub exercises_data: Value,
}

impl SessionRecord {
    /// Minimal record, mostly for seeding and tests
    pub fn new(id: impl Into<String>, user_id: impl Into<String>, completed_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            plan_id: None,
            session_ref: None,
            completed_at,
            week_number: Value::Null,
            day_number: Value::Null,
            plan_name: None,
            session_name: None,
            duration_minutes: Value::Null,
            total_sets: Value::Null,
            total_exercises: Value::Null,
            estimated_calories: Value::Null,
            notes: None,
            exercises_data: Value::Null,
        }
    }

    /// Id used to look up relational set rows: the linked session, else the row itself
    pub fn set_owner_id(&self) -> &str {
        self.session_ref.as_deref().unwrap_or(&self.id)
    }
}

/// Planned exercise within a session (relational layout)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetRow {
    pub id: String,
    pub session_id: String,
    pub exercise_id: String,
    /// Catalog name, when the exercise still exists
    pub exercise_name: Option<String>,
    pub order_in_session: i64,
    pub target_sets: Option<u32>,
    pub target_reps: Option<String>,
}

/// One performed set logged against a [`SetRow`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetLogRow {
    pub id: String,
    pub set_id: String,
    pub actual_reps: u32,
    pub actual_weight: Option<f64>,
    pub actual_rpe: Option<f64>,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Query and command contract the engine needs from persistence.
///
/// Store failures are errors; a missing row is `Ok(None)` or an empty list.
pub trait HistoryStore {
    fn get_session_by_id(&self, id: &str) -> Result<Option<SessionRecord>>;

    /// Completed sessions of a user, newest first
    fn list_completed_sessions(&self, user_id: &str) -> Result<Vec<SessionRecord>>;

    /// Up to `limit` sessions of a plan completed strictly before `before`, newest first
    fn list_plan_sessions(
        &self,
        plan_id: &str,
        before: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<SessionRecord>>;

    /// History rows recorded against a planned session
    fn find_history_by_session_ref(&self, session_ref: &str) -> Result<Vec<SessionRecord>>;

    /// Set rows of a session in session order
    fn get_set_rows_for_session(&self, session_id: &str) -> Result<Vec<SetRow>>;

    /// Logs of a set row in completion order
    fn get_logs_for_set(&self, set_id: &str) -> Result<Vec<SetLogRow>>;

    /// Catalog names for many exercises in one query
    fn get_exercise_names(&self, ids: &[String]) -> Result<HashMap<String, String>>;

    /// Delete a session and its set rows atomically.
    ///
    /// Returns `Ok(false)` when the session does not exist or belongs to
    /// someone else; nothing is deleted in that case. Only set rows keyed by
    /// the history row's own id are removed: rows of a linked planned
    /// session stay, since other history rows may still read them.
    fn delete_session(&self, id: &str, user_id: &str) -> Result<bool>;
}
