//! Session resolver - one canonical session out of whichever source survived
//!
//! A completed workout may have its exercises in its own backup snapshot, in
//! the planned session it was completed from, in another history row pointing
//! at that session, or only in the relational set tables. Sources are tried
//! strictly in [`SOURCES`] order and the first non-empty result wins; results
//! are never merged, so a set stored in two layouts is counted once.

use std::collections::HashSet;
use std::fmt;

use tracing::{debug, info, warn};

use crate::adapters::flat_rows::{self, FlatSetRow};
use crate::adapters::{backup, AdaptContext};
use crate::config::HistoryConfig;
use crate::db::{HistoryStore, SessionRecord};
use crate::error::Result;
use crate::exercises::{self, UNKNOWN_EXERCISE, UNKNOWN_PLAN};
use crate::metrics::{infer_duration, ProgressionComparator};
use crate::model::{CanonicalExercise, CanonicalSession, CanonicalSetLog};
use crate::sanitize::sanitize_count;

pub const PLACEHOLDER_REF: &str = "placeholder";
pub const PLACEHOLDER_NAME: &str = "Workout Data Lost";

/// Where a session's exercises were recovered from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// The history row's own `exercises_data`
    Primary,
    /// The planned session named by `session_ref`
    Secondary,
    /// Other history rows completed from the same planned session
    Tertiary,
    /// `exercise_sets` / `exercise_logs` tables
    RelationalRows,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Primary => write!(f, "primary snapshot"),
            SourceKind::Secondary => write!(f, "linked session"),
            SourceKind::Tertiary => write!(f, "sibling history"),
            SourceKind::RelationalRows => write!(f, "relational rows"),
        }
    }
}

/// One step of the fallback chain. `Ok(None)` means "nothing here, keep going".
pub type Strategy =
    fn(&dyn HistoryStore, &SessionRecord, &AdaptContext) -> Result<Option<Vec<CanonicalExercise>>>;

/// Exercise sources in priority order
pub const SOURCES: &[(SourceKind, Strategy)] = &[
    (SourceKind::Primary, primary_snapshot),
    (SourceKind::Secondary, linked_session),
    (SourceKind::Tertiary, sibling_history),
    (SourceKind::RelationalRows, relational_rows),
];

/// Exercises plus the source that produced them
#[derive(Debug, Clone, PartialEq)]
pub struct Recovered {
    pub source: SourceKind,
    pub exercises: Vec<CanonicalExercise>,
}

/// Walk [`SOURCES`] for `record`, stopping at the first non-empty result.
pub fn recover_exercises(
    store: &dyn HistoryStore,
    record: &SessionRecord,
    ctx: &AdaptContext,
) -> Result<Option<Recovered>> {
    recover_with(SOURCES, store, record, ctx)
}

pub fn recover_with(
    sources: &[(SourceKind, Strategy)],
    store: &dyn HistoryStore,
    record: &SessionRecord,
    ctx: &AdaptContext,
) -> Result<Option<Recovered>> {
    for (source, strategy) in sources {
        debug!("Session {}: trying {}", record.id, source);
        if let Some(exercises) = strategy(store, record, ctx)? {
            if !exercises.is_empty() {
                return Ok(Some(Recovered {
                    source: *source,
                    exercises,
                }));
            }
        }
    }
    Ok(None)
}

/// Resolve a session id into its canonical view.
///
/// `Ok(None)` only when no history row has that id; a row whose exercises
/// cannot be recovered from anywhere yields a placeholder session.
pub fn resolve_session(
    store: &dyn HistoryStore,
    config: &HistoryConfig,
    session_id: &str,
) -> Result<Option<CanonicalSession>> {
    let Some(record) = store.get_session_by_id(session_id)? else {
        debug!("Session {} not found", session_id);
        return Ok(None);
    };
    let ctx = AdaptContext::new(record.completed_at);

    let mut exercises = match recover_exercises(store, &record, &ctx)? {
        Some(recovered) => {
            info!(
                "Session {}: {} exercises from {}",
                record.id,
                recovered.exercises.len(),
                recovered.source
            );
            recovered.exercises
        }
        None => Vec::new(),
    };
    resolve_names(store, &mut exercises)?;

    let duration = infer_duration(
        sanitize_count(&record.duration_minutes),
        exercises.iter().map(|e| e.logs.as_slice()),
    );

    if exercises.is_empty() {
        warn!("Session {}: no exercise data recoverable, using placeholder", record.id);
        exercises.push(placeholder_exercise(&record));
    } else if config.attach_progression {
        if let Some(plan_id) = record.plan_id.as_deref() {
            let comparator = ProgressionComparator::new(store, config.comparison_window);
            for exercise in exercises.iter_mut() {
                if exercises::is_synthetic(&exercise.exercise_ref) {
                    continue;
                }
                exercise.comparison = comparator.compare_to_previous(plan_id, &record, exercise)?;
            }
        }
    }

    Ok(Some(CanonicalSession {
        id: record.id.clone(),
        completed_at: record.completed_at,
        duration_minutes: duration,
        plan_name: plan_name(&record),
        plan_id: record.plan_id,
        session_name: record.session_name,
        week_number: sanitize_count(&record.week_number),
        day_number: sanitize_count(&record.day_number),
        exercises,
    }))
}

/// Replace "Unknown Exercise" with catalog names, one lookup for the whole session.
pub fn resolve_names(store: &dyn HistoryStore, exercises: &mut [CanonicalExercise]) -> Result<()> {
    let mut seen = HashSet::new();
    let missing: Vec<String> = exercises
        .iter()
        .filter(|e| e.exercise_name == UNKNOWN_EXERCISE && !exercises::is_synthetic(&e.exercise_ref))
        .map(|e| e.exercise_ref.clone())
        .filter(|r| seen.insert(r.clone()))
        .collect();
    if missing.is_empty() {
        return Ok(());
    }

    let names = store.get_exercise_names(&missing)?;
    for exercise in exercises.iter_mut() {
        if exercise.exercise_name != UNKNOWN_EXERCISE {
            continue;
        }
        match names.get(&exercise.exercise_ref).and_then(|n| exercises::clean_name(n)) {
            Some(name) => exercise.exercise_name = name,
            None => debug!("Exercise {} has no catalog name", exercise.exercise_ref),
        }
    }
    Ok(())
}

fn plan_name(record: &SessionRecord) -> Option<String> {
    match (&record.plan_name, &record.plan_id) {
        (Some(name), _) => Some(name.clone()),
        (None, Some(_)) => Some(UNKNOWN_PLAN.to_string()),
        (None, None) => None,
    }
}

fn placeholder_exercise(record: &SessionRecord) -> CanonicalExercise {
    let plan = record.plan_name.as_deref().unwrap_or(UNKNOWN_PLAN);
    let date = record.completed_at.format("%Y-%m-%d");
    let note = match record.session_name.as_deref() {
        Some(session) => format!(
            "Original workout details were lost when the plan \"{plan}\" was deleted. \
             This workout ({session}) was completed on {date}."
        ),
        None => format!(
            "Original workout details were lost when the plan \"{plan}\" was deleted. \
             This workout was completed on {date}."
        ),
    };

    let log = CanonicalSetLog {
        id: exercises::synthetic_id("log", &record.id),
        actual_reps: 0,
        actual_weight: None,
        actual_rpe: None,
        completed_at: Some(record.completed_at),
        notes: Some(note),
    };
    CanonicalExercise::new(PLACEHOLDER_REF, PLACEHOLDER_NAME, vec![log])
}

fn non_empty(exercises: Vec<CanonicalExercise>) -> Option<Vec<CanonicalExercise>> {
    (!exercises.is_empty()).then_some(exercises)
}

fn primary_snapshot(
    _store: &dyn HistoryStore,
    record: &SessionRecord,
    ctx: &AdaptContext,
) -> Result<Option<Vec<CanonicalExercise>>> {
    Ok(non_empty(backup::adapt(&record.exercises_data, ctx)))
}

fn linked_session(
    store: &dyn HistoryStore,
    record: &SessionRecord,
    ctx: &AdaptContext,
) -> Result<Option<Vec<CanonicalExercise>>> {
    let Some(session_ref) = record.session_ref.as_deref().filter(|r| *r != record.id) else {
        return Ok(None);
    };
    match store.get_session_by_id(session_ref)? {
        Some(linked) => Ok(non_empty(backup::adapt(&linked.exercises_data, ctx))),
        None => {
            debug!("Session {}: linked session {} no longer exists", record.id, session_ref);
            Ok(None)
        }
    }
}

fn sibling_history(
    store: &dyn HistoryStore,
    record: &SessionRecord,
    ctx: &AdaptContext,
) -> Result<Option<Vec<CanonicalExercise>>> {
    let Some(session_ref) = record.session_ref.as_deref() else {
        return Ok(None);
    };
    for sibling in store.find_history_by_session_ref(session_ref)? {
        if sibling.id == record.id {
            continue;
        }
        if let Some(exercises) = non_empty(backup::adapt(&sibling.exercises_data, ctx)) {
            debug!("Session {}: using snapshot of {}", record.id, sibling.id);
            return Ok(Some(exercises));
        }
    }
    Ok(None)
}

fn relational_rows(
    store: &dyn HistoryStore,
    record: &SessionRecord,
    _ctx: &AdaptContext,
) -> Result<Option<Vec<CanonicalExercise>>> {
    let mut rows = Vec::new();
    for set in store.get_set_rows_for_session(record.set_owner_id())? {
        let name = set.exercise_name.as_deref().and_then(exercises::clean_name);
        for log in store.get_logs_for_set(&set.id)? {
            rows.push(FlatSetRow {
                id: Some(log.id),
                exercise_ref: set.exercise_id.clone(),
                exercise_name: name.clone(),
                reps: log.actual_reps,
                weight: log.actual_weight,
                rpe: log.actual_rpe,
                completed_at: log.completed_at,
                notes: log.notes,
                target_sets: set.target_sets,
                target_reps: set.target_reps.clone(),
            });
        }
    }
    Ok(non_empty(flat_rows::group_rows(rows)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, SetLogRow, SetRow};
    use crate::error::HistoryError;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use serde_json::json;
    use std::collections::HashMap;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
    }

    fn no_progression() -> HistoryConfig {
        HistoryConfig {
            attach_progression: false,
            ..HistoryConfig::default()
        }
    }

    fn create_set(id: &str, session: &str, exercise: &str, order: i64) -> SetRow {
        SetRow {
            id: id.to_string(),
            session_id: session.to_string(),
            exercise_id: exercise.to_string(),
            exercise_name: None,
            order_in_session: order,
            target_sets: Some(3),
            target_reps: None,
        }
    }

    fn create_log(id: &str, set: &str, reps: u32, weight: f64, minute: i64) -> SetLogRow {
        SetLogRow {
            id: id.to_string(),
            set_id: set.to_string(),
            actual_reps: reps,
            actual_weight: Some(weight),
            actual_rpe: None,
            completed_at: Some(t0() + Duration::minutes(minute)),
            notes: None,
        }
    }

    /// Store whose every query fails
    struct UnavailableStore;

    impl HistoryStore for UnavailableStore {
        fn get_session_by_id(&self, _id: &str) -> Result<Option<SessionRecord>> {
            Err(HistoryError::StoreUnavailable("connection reset".into()))
        }
        fn list_completed_sessions(&self, _user_id: &str) -> Result<Vec<SessionRecord>> {
            Err(HistoryError::StoreUnavailable("connection reset".into()))
        }
        fn list_plan_sessions(
            &self,
            _plan_id: &str,
            _before: DateTime<Utc>,
            _limit: usize,
        ) -> Result<Vec<SessionRecord>> {
            Err(HistoryError::StoreUnavailable("connection reset".into()))
        }
        fn find_history_by_session_ref(&self, _session_ref: &str) -> Result<Vec<SessionRecord>> {
            Err(HistoryError::StoreUnavailable("connection reset".into()))
        }
        fn get_set_rows_for_session(&self, _session_id: &str) -> Result<Vec<SetRow>> {
            Err(HistoryError::StoreUnavailable("connection reset".into()))
        }
        fn get_logs_for_set(&self, _set_id: &str) -> Result<Vec<SetLogRow>> {
            Err(HistoryError::StoreUnavailable("connection reset".into()))
        }
        fn get_exercise_names(&self, _ids: &[String]) -> Result<HashMap<String, String>> {
            Err(HistoryError::StoreUnavailable("connection reset".into()))
        }
        fn delete_session(&self, _id: &str, _user_id: &str) -> Result<bool> {
            Err(HistoryError::StoreUnavailable("connection reset".into()))
        }
    }

    #[test]
    fn test_legacy_end_to_end() {
        let db = Database::open_in_memory().unwrap();
        let mut record = SessionRecord::new("h1", "u1", t0());
        record.exercises_data =
            json!({"name": "Bench Press", "sets": 3, "reps": [10, 8, 6], "weights": [60, 70, 80]});
        db.add_history_record(&record).unwrap();

        let session = resolve_session(&db, &HistoryConfig::default(), "h1").unwrap().unwrap();
        assert_eq!(session.exercises.len(), 1);
        let bench = &session.exercises[0];
        assert_eq!(bench.exercise_name, "Bench Press");
        assert_eq!(bench.total_volume, 1640.0);
        assert_eq!(bench.top_set_weight, Some(80.0));
        assert_eq!(session.duration_minutes, Some(2));
        assert_eq!(session.completed_at, t0());
    }

    #[test]
    fn test_first_source_wins_without_merging() {
        let db = Database::open_in_memory().unwrap();
        let mut record = SessionRecord::new("h1", "u1", t0());
        record.exercises_data = json!({"exercises": [
            {"exercise_id": "ex-a", "name": "Squat", "sets": [{"reps": 5, "weight": 100}, {"reps": 5, "weight": 100}]}
        ]});
        db.add_history_record(&record).unwrap();
        db.add_set_row(&create_set("s1", "h1", "ex-a", 1)).unwrap();
        for i in 0..3 {
            db.add_log_row(&create_log(&format!("l{i}"), "s1", 5, 100.0, i)).unwrap();
        }

        let session = resolve_session(&db, &no_progression(), "h1").unwrap().unwrap();
        assert_eq!(session.exercises.len(), 1);
        assert_eq!(session.total_sets(), 2);
        assert_eq!(session.exercises[0].total_volume, 1000.0);
    }

    #[test]
    fn test_relational_rows_with_catalog_names() {
        let db = Database::open_in_memory().unwrap();
        db.add_exercise("ex-a", "Deadlift").unwrap();
        db.add_history_record(&SessionRecord::new("h1", "u1", t0())).unwrap();
        db.add_set_row(&create_set("s1", "h1", "ex-a", 1)).unwrap();
        db.add_set_row(&create_set("s2", "h1", "ex-b", 2)).unwrap();
        db.add_log_row(&create_log("l1", "s1", 5, 140.0, 0)).unwrap();
        db.add_log_row(&create_log("l2", "s2", 10, 20.0, 9)).unwrap();

        let session = resolve_session(&db, &no_progression(), "h1").unwrap().unwrap();
        let names: Vec<_> = session.exercises.iter().map(|e| e.exercise_name.as_str()).collect();
        assert_eq!(names, vec!["Deadlift", UNKNOWN_EXERCISE]);
        assert_eq!(session.duration_minutes, Some(9));
        assert_eq!(session.exercises[0].target_sets, Some(3));
    }

    #[test]
    fn test_linked_session_snapshot() {
        let db = Database::open_in_memory().unwrap();
        let mut planned = SessionRecord::new("planned-1", "u1", t0() - Duration::days(1));
        planned.exercises_data = json!([{"name": "Row", "sets": [{"reps": 8, "weight": 40}]}]);
        db.add_history_record(&planned).unwrap();

        let mut record = SessionRecord::new("h1", "u1", t0());
        record.session_ref = Some("planned-1".to_string());
        db.add_history_record(&record).unwrap();

        let ctx = AdaptContext::new(t0());
        let recovered = recover_exercises(&db, &record, &ctx).unwrap().unwrap();
        assert_eq!(recovered.source, SourceKind::Secondary);
        assert_eq!(recovered.exercises[0].exercise_name, "Row");
    }

    #[test]
    fn test_sibling_history_snapshot() {
        let db = Database::open_in_memory().unwrap();
        let mut sibling = SessionRecord::new("h0", "u1", t0() - Duration::hours(1));
        sibling.session_ref = Some("deleted-session".to_string());
        sibling.exercises_data = json!([{"name": "Dip", "sets": [{"reps": 12}]}]);
        db.add_history_record(&sibling).unwrap();

        let mut record = SessionRecord::new("h1", "u1", t0());
        record.session_ref = Some("deleted-session".to_string());
        db.add_history_record(&record).unwrap();

        let ctx = AdaptContext::new(t0());
        let recovered = recover_exercises(&db, &record, &ctx).unwrap().unwrap();
        assert_eq!(recovered.source, SourceKind::Tertiary);
        assert_eq!(recovered.exercises[0].exercise_name, "Dip");
    }

    fn nothing(
        _: &dyn HistoryStore,
        _: &SessionRecord,
        _: &AdaptContext,
    ) -> Result<Option<Vec<CanonicalExercise>>> {
        Ok(None)
    }

    fn empty(
        _: &dyn HistoryStore,
        _: &SessionRecord,
        _: &AdaptContext,
    ) -> Result<Option<Vec<CanonicalExercise>>> {
        Ok(Some(Vec::new()))
    }

    fn one_squat(
        _: &dyn HistoryStore,
        _: &SessionRecord,
        _: &AdaptContext,
    ) -> Result<Option<Vec<CanonicalExercise>>> {
        Ok(Some(vec![CanonicalExercise::new("ex-a", "Squat", Vec::new())]))
    }

    fn unreachable_source(
        _: &dyn HistoryStore,
        _: &SessionRecord,
        _: &AdaptContext,
    ) -> Result<Option<Vec<CanonicalExercise>>> {
        panic!("source after the first hit must not be queried")
    }

    #[test]
    fn test_strategy_order_short_circuits() {
        let sources: &[(SourceKind, Strategy)] = &[
            (SourceKind::Primary, nothing),
            (SourceKind::Secondary, empty),
            (SourceKind::Tertiary, one_squat),
            (SourceKind::RelationalRows, unreachable_source),
        ];
        let record = SessionRecord::new("h1", "u1", t0());
        let ctx = AdaptContext::new(t0());

        let recovered = recover_with(sources, &UnavailableStore, &record, &ctx).unwrap().unwrap();
        assert_eq!(recovered.source, SourceKind::Tertiary);
        assert_eq!(recovered.exercises.len(), 1);
    }

    #[test]
    fn test_placeholder_when_nothing_survived() {
        let db = Database::open_in_memory().unwrap();
        let mut record = SessionRecord::new("h1", "u1", t0());
        record.plan_id = Some("gone".to_string());
        record.plan_name = Some("Strength Block".to_string());
        record.exercises_data = json!("{corrupt");
        db.add_history_record(&record).unwrap();

        let session = resolve_session(&db, &HistoryConfig::default(), "h1").unwrap().unwrap();
        assert_eq!(session.exercises.len(), 1);
        let placeholder = &session.exercises[0];
        assert_eq!(placeholder.exercise_ref, PLACEHOLDER_REF);
        assert_eq!(placeholder.exercise_name, PLACEHOLDER_NAME);
        let note = placeholder.logs[0].notes.as_deref().unwrap();
        assert!(note.contains("Strength Block"));
        assert!(note.contains("2024-01-01"));
        assert_eq!(session.duration_minutes, None);
    }

    #[test]
    fn test_dangling_plan_gets_unknown_plan_name() {
        let db = Database::open_in_memory().unwrap();
        let mut record = SessionRecord::new("h1", "u1", t0());
        record.plan_id = Some("gone".to_string());
        record.week_number = json!("2");
        record.duration_minutes = json!("4?5");
        db.add_history_record(&record).unwrap();

        let session = resolve_session(&db, &HistoryConfig::default(), "h1").unwrap().unwrap();
        assert_eq!(session.plan_name.as_deref(), Some(UNKNOWN_PLAN));
        assert_eq!(session.week_number, Some(2));
        assert_eq!(session.duration_minutes, Some(45));
        let note = session.exercises[0].logs[0].notes.as_deref().unwrap();
        assert!(note.contains(UNKNOWN_PLAN));
    }

    #[test]
    fn test_missing_session_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(resolve_session(&db, &HistoryConfig::default(), "nope").unwrap().is_none());
    }

    #[test]
    fn test_store_failure_propagates() {
        let result = resolve_session(&UnavailableStore, &HistoryConfig::default(), "h1");
        assert!(matches!(result, Err(ref e) if e.is_store_failure()));
    }

    #[test]
    fn test_names_resolved_in_one_batch() {
        let db = Database::open_in_memory().unwrap();
        db.add_exercise("ex-a", "Overhead Press").unwrap();
        db.add_exercise("ex-b", "42").unwrap();

        let mut exercises = vec![
            CanonicalExercise::new("ex-a", UNKNOWN_EXERCISE, Vec::new()),
            CanonicalExercise::new("ex-b", UNKNOWN_EXERCISE, Vec::new()),
            CanonicalExercise::new("ex-a", UNKNOWN_EXERCISE, Vec::new()),
            CanonicalExercise::new(exercises::synthetic_id("exercise", 3), UNKNOWN_EXERCISE, Vec::new()),
        ];
        resolve_names(&db, &mut exercises).unwrap();

        let names: Vec<_> = exercises.iter().map(|e| e.exercise_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Overhead Press", UNKNOWN_EXERCISE, "Overhead Press", UNKNOWN_EXERCISE]
        );
    }

    #[test]
    fn test_progression_attached_for_plan_sessions() {
        let db = Database::open_in_memory().unwrap();
        let mut previous = SessionRecord::new("h0", "u1", t0() - Duration::days(7));
        previous.plan_id = Some("plan-1".to_string());
        previous.exercises_data =
            json!([{"exercise_id": "ex-a", "name": "Squat", "sets": [{"reps": 5, "weight": 100}]}]);
        db.add_history_record(&previous).unwrap();

        let mut current = SessionRecord::new("h1", "u1", t0());
        current.plan_id = Some("plan-1".to_string());
        current.exercises_data = json!([
            {"exercise_id": "ex-a", "name": "Squat", "sets": [{"reps": 5, "weight": 110}]},
            {"exercise_id": "ex-b", "name": "Lunge", "sets": [{"reps": 10, "weight": 20}]}
        ]);
        db.add_history_record(&current).unwrap();

        let session = resolve_session(&db, &HistoryConfig::default(), "h1").unwrap().unwrap();
        let squat = session.exercises[0].comparison.as_ref().unwrap();
        assert_eq!(squat.volume_delta, 50.0);
        assert_eq!(squat.top_set_delta, Some(10.0));
        assert!(session.exercises[1].comparison.is_none());

        let plain = resolve_session(&db, &no_progression(), "h1").unwrap().unwrap();
        assert!(plain.exercises[0].comparison.is_none());
    }
}
