//! Progression against the previous occurrence of an exercise in the same plan

use tracing::debug;

use crate::adapters::AdaptContext;
use crate::db::{HistoryStore, SessionRecord};
use crate::error::Result;
use crate::model::{CanonicalExercise, ProgressionDelta};
use crate::resolver;

pub struct ProgressionComparator<'a> {
    store: &'a dyn HistoryStore,
    window: usize,
}

impl<'a> ProgressionComparator<'a> {
    /// `window` bounds how many earlier sessions of the plan are scanned
    pub fn new(store: &'a dyn HistoryStore, window: usize) -> Self {
        Self { store, window }
    }

    /// Delta of `current` against the nearest earlier session of `plan_id`
    /// that contains the same exercise.
    ///
    /// `None` when no earlier occurrence exists within the window, which is
    /// not the same as a zero delta.
    pub fn compare_to_previous(
        &self,
        plan_id: &str,
        before: &SessionRecord,
        current: &CanonicalExercise,
    ) -> Result<Option<ProgressionDelta>> {
        let candidates = self
            .store
            .list_plan_sessions(plan_id, before.completed_at, self.window + 1)?;

        for candidate in candidates.iter().filter(|c| c.id != before.id).take(self.window) {
            let ctx = AdaptContext::new(candidate.completed_at);
            let Some(recovered) = resolver::recover_exercises(self.store, candidate, &ctx)? else {
                continue;
            };
            if let Some(previous) = recovered
                .exercises
                .iter()
                .find(|e| e.exercise_ref == current.exercise_ref)
            {
                debug!(
                    "Exercise {}: previous occurrence in session {}",
                    current.exercise_ref, candidate.id
                );
                return Ok(Some(delta(current, previous)));
            }
        }

        Ok(None)
    }
}

/// Signed change from `previous` to `current`
pub fn delta(current: &CanonicalExercise, previous: &CanonicalExercise) -> ProgressionDelta {
    ProgressionDelta {
        volume_delta: current.total_volume - previous.total_volume,
        top_set_delta: match (current.top_set_weight, previous.top_set_weight) {
            (Some(now), Some(then)) => Some(now - then),
            _ => None,
        },
    }
}
