//! liftlog - workout history reconciliation and training analytics
//!
//! Years of completed workouts stored in whatever shape was current at the
//! time, read back as one canonical view with derived training metrics.

pub mod adapters;
pub mod config;
pub mod db;
pub mod error;
pub mod exercises;
pub mod history;
pub mod metrics;
pub mod model;
pub mod resolver;
pub mod sanitize;
pub mod summary;

pub use config::HistoryConfig;
pub use db::{Database, HistoryStore};
pub use error::{HistoryError, Result};
pub use history::WorkoutHistory;
