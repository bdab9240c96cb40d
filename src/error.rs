//! Error types shared by the store and the engine

use thiserror::Error;

/// Errors surfaced to callers of the history engine.
///
/// "Not found" is never an error: lookups return `Ok(None)` for that.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Backing store could not answer (connection lost, locked, ...)
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Delete removed one layer of a session but not the other
    #[error("session {session_id} was only partially deleted: {detail}")]
    PartialDelete { session_id: String, detail: String },
}

impl HistoryError {
    /// True for failures of the underlying store, which callers may retry.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, HistoryError::StoreUnavailable(_) | HistoryError::Sqlite(_))
    }
}

pub type Result<T> = std::result::Result<T, HistoryError>;
