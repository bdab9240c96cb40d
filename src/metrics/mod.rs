//! Metrics module - training figures derived on read
//!
//! Features:
//! - Volume and top set per exercise
//! - Session duration inference from the best available evidence
//! - Progression deltas against the previous occurrence of an exercise

pub mod duration;
pub mod progression;

pub use duration::infer_duration;
pub use progression::ProgressionComparator;

use crate::model::CanonicalSetLog;

/// Sum of weight × reps over sets that recorded a weight
pub fn total_volume(logs: &[CanonicalSetLog]) -> f64 {
    logs.iter()
        .filter_map(|l| l.actual_weight.map(|w| w * l.actual_reps as f64))
        .sum()
}

/// Heaviest recorded weight, `None` if no set recorded one
pub fn top_set_weight(logs: &[CanonicalSetLog]) -> Option<f64> {
    logs.iter()
        .filter_map(|l| l.actual_weight)
        .fold(None, |max, w| match max {
            Some(m) if m >= w => Some(m),
            _ => Some(w),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_log(reps: u32, weight: Option<f64>) -> CanonicalSetLog {
        CanonicalSetLog {
            id: "l".to_string(),
            actual_reps: reps,
            actual_weight: weight,
            actual_rpe: None,
            completed_at: None,
            notes: None,
        }
    }

    #[test]
    fn test_total_volume_skips_unweighted_sets() {
        let logs = vec![create_log(10, Some(60.0)), create_log(12, None), create_log(8, Some(70.0))];
        assert_eq!(total_volume(&logs), 1160.0);
    }

    #[test]
    fn test_total_volume_empty() {
        assert_eq!(total_volume(&[]), 0.0);
    }

    #[test]
    fn test_top_set_weight() {
        let logs = vec![create_log(10, Some(60.0)), create_log(3, Some(90.0)), create_log(8, Some(70.0))];
        assert_eq!(top_set_weight(&logs), Some(90.0));
    }

    #[test]
    fn test_top_set_weight_zero_is_a_weight() {
        let logs = vec![create_log(10, Some(0.0)), create_log(10, None)];
        assert_eq!(top_set_weight(&logs), Some(0.0));
    }

    #[test]
    fn test_top_set_weight_absent() {
        let logs = vec![create_log(10, None)];
        assert_eq!(top_set_weight(&logs), None);
    }
}
