//! Workout history service - the operations exposed to the UI/API layer

use tracing::{info, warn};

use crate::adapters::AdaptContext;
use crate::config::HistoryConfig;
use crate::db::HistoryStore;
use crate::error::Result;
use crate::exercises;
use crate::metrics::ProgressionComparator;
use crate::model::{CanonicalExercise, CanonicalSession, CanonicalSessionSummary};
use crate::resolver;
use crate::summary;

/// History engine over a store.
///
/// Every call recomputes from the store; nothing is cached between calls.
pub struct WorkoutHistory<S: HistoryStore> {
    store: S,
    config: HistoryConfig,
}

impl<S: HistoryStore> WorkoutHistory<S> {
    pub fn new(store: S, config: HistoryConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// List-view summaries of a user's completed sessions, newest first
    pub fn get_completed_sessions(&self, user_id: &str) -> Result<Vec<CanonicalSessionSummary>> {
        let rows = self.store.list_completed_sessions(user_id)?;
        info!("Loaded {} completed sessions for {}", rows.len(), user_id);
        Ok(summary::build_summaries(&rows))
    }

    /// Full canonical view of one session, `None` if the id is unknown
    pub fn get_session_details(&self, session_id: &str) -> Result<Option<CanonicalSession>> {
        resolver::resolve_session(&self.store, &self.config, session_id)
    }

    /// One exercise of a session with its progression against the plan's
    /// previous occurrence, regardless of `attach_progression`.
    pub fn get_exercise_details(
        &self,
        session_id: &str,
        exercise_ref: &str,
    ) -> Result<Option<CanonicalExercise>> {
        let Some(record) = self.store.get_session_by_id(session_id)? else {
            return Ok(None);
        };
        let ctx = AdaptContext::new(record.completed_at);
        let Some(recovered) = resolver::recover_exercises(&self.store, &record, &ctx)? else {
            return Ok(None);
        };
        let Some(mut exercise) = recovered
            .exercises
            .into_iter()
            .find(|e| e.exercise_ref == exercise_ref)
        else {
            return Ok(None);
        };

        resolver::resolve_names(&self.store, std::slice::from_mut(&mut exercise))?;
        if let Some(plan_id) = record.plan_id.as_deref() {
            if !exercises::is_synthetic(&exercise.exercise_ref) {
                let comparator = ProgressionComparator::new(&self.store, self.config.comparison_window);
                exercise.comparison = comparator.compare_to_previous(plan_id, &record, &exercise)?;
            }
        }
        Ok(Some(exercise))
    }

    /// Delete a session owned by `user_id` together with its set rows.
    ///
    /// `Ok(false)` when there is nothing of that user's to delete.
    pub fn delete_session(&self, session_id: &str, user_id: &str) -> Result<bool> {
        let deleted = self.store.delete_session(session_id, user_id)?;
        if deleted {
            info!("Session {} deleted for {}", session_id, user_id);
        } else {
            warn!("Refused to delete session {} for {}", session_id, user_id);
        }
        Ok(deleted)
    }
}
