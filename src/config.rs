//! Engine configuration

use serde::{Deserialize, Serialize};

/// How many earlier plan sessions the progression comparator scans
pub const DEFAULT_COMPARISON_WINDOW: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Earlier sessions of the same plan searched for a previous occurrence
    pub comparison_window: usize,
    /// Attach progression deltas to every exercise of a detailed session
    pub attach_progression: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            comparison_window: DEFAULT_COMPARISON_WINDOW,
            attach_progression: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HistoryConfig::default();
        assert_eq!(config.comparison_window, 10);
        assert!(config.attach_progression);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: HistoryConfig = serde_json::from_str(r#"{"comparison_window": 3}"#).unwrap();
        assert_eq!(config.comparison_window, 3);
        assert!(config.attach_progression);
    }
}
