//! SQLite storage for workout history

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde_json::Value;
use tracing::{info, warn};

use super::{HistoryStore, SessionRecord, SetLogRow, SetRow};
use crate::error::{HistoryError, Result};
use crate::model::parse_timestamp;
use crate::sanitize::{sanitize_count, sanitize_number};

const HISTORY_COLUMNS: &str = "id, user_id, plan_id, session_ref, completed_at, week_number, \
     day_number, plan_name, session_name, duration_minutes, total_sets, total_exercises, \
     estimated_calories, notes, exercises_data";

/// Database wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema.
    ///
    /// Numeric history columns are declared without a type so whatever the
    /// writer stored (including corrupted text) is read back unchanged.
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS workout_history (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                plan_id TEXT,
                session_ref TEXT,
                completed_at TEXT NOT NULL,
                week_number,
                day_number,
                plan_name TEXT,
                session_name TEXT,
                duration_minutes,
                total_sets,
                total_exercises,
                estimated_calories,
                notes TEXT,
                exercises_data TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_history_user ON workout_history (user_id);
            CREATE INDEX IF NOT EXISTS idx_history_plan ON workout_history (plan_id);
            CREATE INDEX IF NOT EXISTS idx_history_session_ref ON workout_history (session_ref);

            CREATE TABLE IF NOT EXISTS exercises (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS exercise_sets (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL,
                exercise_id TEXT NOT NULL,
                order_in_session INTEGER NOT NULL DEFAULT 0,
                target_sets INTEGER,
                target_reps TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_sets_session ON exercise_sets (session_id);

            CREATE TABLE IF NOT EXISTS exercise_logs (
                id TEXT PRIMARY KEY,
                set_id TEXT NOT NULL,
                actual_reps,
                actual_weight,
                actual_rpe,
                completed_at TEXT,
                notes TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_logs_set ON exercise_logs (set_id);",
        )?;
        Ok(())
    }

    /// Add a completed workout record
    pub fn add_history_record(&self, record: &SessionRecord) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO workout_history ({HISTORY_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
            ),
            params![
                record.id,
                record.user_id,
                record.plan_id,
                record.session_ref,
                record.completed_at.to_rfc3339(),
                json_to_sql(&record.week_number),
                json_to_sql(&record.day_number),
                record.plan_name,
                record.session_name,
                json_to_sql(&record.duration_minutes),
                json_to_sql(&record.total_sets),
                json_to_sql(&record.total_exercises),
                json_to_sql(&record.estimated_calories),
                record.notes,
                payload_to_sql(&record.exercises_data),
            ],
        )?;
        Ok(())
    }

    pub fn add_exercise(&self, id: &str, name: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO exercises (id, name) VALUES (?1, ?2)",
            params![id, name],
        )?;
        Ok(())
    }

    pub fn add_set_row(&self, set: &SetRow) -> Result<()> {
        self.conn.execute(
            "INSERT INTO exercise_sets (id, session_id, exercise_id, order_in_session, target_sets, target_reps)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                set.id,
                set.session_id,
                set.exercise_id,
                set.order_in_session,
                set.target_sets,
                set.target_reps,
            ],
        )?;
        Ok(())
    }

    pub fn add_log_row(&self, log: &SetLogRow) -> Result<()> {
        self.conn.execute(
            "INSERT INTO exercise_logs (id, set_id, actual_reps, actual_weight, actual_rpe, completed_at, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                log.id,
                log.set_id,
                log.actual_reps,
                log.actual_weight,
                log.actual_rpe,
                log.completed_at.map(|t| t.to_rfc3339()),
                log.notes,
            ],
        )?;
        Ok(())
    }

    /// Run raw SQL against the underlying connection (fixtures, maintenance)
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn query_history(&self, filter: &str, value: &str) -> Result<Vec<SessionRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {HISTORY_COLUMNS} FROM workout_history WHERE {filter} = ?1"
        ))?;
        let mut records: Vec<SessionRecord> = stmt
            .query_map([value], history_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?
            .into_iter()
            .flatten()
            .collect();
        // Sorted here: stored timestamps do not share one textual format
        records.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(records)
    }
}

impl HistoryStore for Database {
    fn get_session_by_id(&self, id: &str) -> Result<Option<SessionRecord>> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {HISTORY_COLUMNS} FROM workout_history WHERE id = ?1"),
                [id],
                history_from_row,
            )
            .optional()?;
        Ok(record.flatten())
    }

    fn list_completed_sessions(&self, user_id: &str) -> Result<Vec<SessionRecord>> {
        self.query_history("user_id", user_id)
    }

    fn list_plan_sessions(
        &self,
        plan_id: &str,
        before: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<SessionRecord>> {
        let mut records = self.query_history("plan_id", plan_id)?;
        records.retain(|r| r.completed_at < before);
        records.truncate(limit);
        Ok(records)
    }

    fn find_history_by_session_ref(&self, session_ref: &str) -> Result<Vec<SessionRecord>> {
        self.query_history("session_ref", session_ref)
    }

    fn get_set_rows_for_session(&self, session_id: &str) -> Result<Vec<SetRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.id, s.session_id, s.exercise_id, e.name, s.order_in_session, s.target_sets, s.target_reps
             FROM exercise_sets s
             LEFT JOIN exercises e ON e.id = s.exercise_id
             WHERE s.session_id = ?1
             ORDER BY s.order_in_session, s.rowid",
        )?;

        let sets = stmt
            .query_map([session_id], |row| {
                Ok(SetRow {
                    id: row.get(0)?,
                    session_id: row.get(1)?,
                    exercise_id: row.get(2)?,
                    exercise_name: row.get(3)?,
                    order_in_session: row.get(4)?,
                    target_sets: row.get(5)?,
                    target_reps: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(sets)
    }

    fn get_logs_for_set(&self, set_id: &str) -> Result<Vec<SetLogRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, set_id, actual_reps, actual_weight, actual_rpe, completed_at, notes
             FROM exercise_logs WHERE set_id = ?1 ORDER BY completed_at, rowid",
        )?;

        let mut logs = stmt
            .query_map([set_id], |row| {
                let completed_at: Option<String> = row.get(5)?;
                Ok(SetLogRow {
                    id: row.get(0)?,
                    set_id: row.get(1)?,
                    actual_reps: sanitize_count(&dynamic_column(row, 2)?).unwrap_or(0),
                    actual_weight: sanitize_number(&dynamic_column(row, 3)?),
                    actual_rpe: sanitize_number(&dynamic_column(row, 4)?),
                    completed_at: completed_at.as_deref().and_then(parse_timestamp),
                    notes: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        // Untimed logs keep insertion order after the timed ones
        logs.sort_by_key(|l| (l.completed_at.is_none(), l.completed_at));
        Ok(logs)
    }

    fn get_exercise_names(&self, ids: &[String]) -> Result<HashMap<String, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, name FROM exercises WHERE id IN ({placeholders})"
        ))?;

        let names = stmt
            .query_map(params_from_iter(ids.iter()), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<HashMap<_, _>, _>>()?;

        Ok(names)
    }

    /// Set rows are removed by the history row's own id. Rows owned by a
    /// linked planned session (`session_ref`) are left in place.
    fn delete_session(&self, id: &str, user_id: &str) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;

        let owned: Option<String> = tx
            .query_row(
                "SELECT id FROM workout_history WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
                |row| row.get(0),
            )
            .optional()?;
        if owned.is_none() {
            warn!("Session {} not found or not owned by {}", id, user_id);
            return Ok(false);
        }

        let logs = tx.execute(
            "DELETE FROM exercise_logs WHERE set_id IN (SELECT id FROM exercise_sets WHERE session_id = ?1)",
            [id],
        )?;
        let sets = tx.execute("DELETE FROM exercise_sets WHERE session_id = ?1", [id])?;
        let removed = tx.execute(
            "DELETE FROM workout_history WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;

        if removed != 1 {
            // Dropping the transaction rolls the set deletions back
            return Err(HistoryError::PartialDelete {
                session_id: id.to_string(),
                detail: format!("expected to remove 1 history row, removed {removed}"),
            });
        }

        tx.commit()?;
        info!("Deleted session {} ({} set rows, {} logs)", id, sets, logs);
        Ok(true)
    }
}

/// Map a history row; `None` (logged) when its completion time is unreadable.
fn history_from_row(row: &Row<'_>) -> rusqlite::Result<Option<SessionRecord>> {
    let id: String = row.get(0)?;
    let completed_raw: String = row.get(4)?;
    let Some(completed_at) = parse_timestamp(&completed_raw) else {
        warn!("Skipping history row {}: unparseable completed_at {:?}", id, completed_raw);
        return Ok(None);
    };
    let exercises_data: Option<String> = row.get(14)?;

    Ok(Some(SessionRecord {
        id,
        user_id: row.get(1)?,
        plan_id: row.get(2)?,
        session_ref: row.get(3)?,
        completed_at,
        week_number: dynamic_column(row, 5)?,
        day_number: dynamic_column(row, 6)?,
        plan_name: row.get(7)?,
        session_name: row.get(8)?,
        duration_minutes: dynamic_column(row, 9)?,
        total_sets: dynamic_column(row, 10)?,
        total_exercises: dynamic_column(row, 11)?,
        estimated_calories: dynamic_column(row, 12)?,
        notes: row.get(13)?,
        exercises_data: exercises_data.map(payload_from_sql).unwrap_or(Value::Null),
    }))
}

/// Read an untyped column as JSON so the sanitizer can deal with it
fn dynamic_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Value> {
    Ok(match row.get::<_, SqlValue>(idx)? {
        SqlValue::Null | SqlValue::Blob(_) => Value::Null,
        SqlValue::Integer(i) => Value::from(i),
        SqlValue::Real(f) => serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        SqlValue::Text(s) => Value::String(s),
    })
}

fn json_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn payload_to_sql(payload: &Value) -> Option<String> {
    match payload {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Stored payload text that is not JSON is handed on as a string
fn payload_from_sql(text: String) -> Value {
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}
