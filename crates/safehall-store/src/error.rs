//! Error types for the store module.

use thiserror::Error;

use safehall_core::IncidentError;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Record serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Referenced record not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid or inconsistent data.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A thread panicked while holding the store lock.
    #[error("store lock poisoned")]
    LockPoisoned,

    /// The blocking worker was cancelled or panicked.
    #[error("blocking task failed: {0}")]
    Task(String),

    /// Rejected incident status change.
    #[error(transparent)]
    Incident(#[from] IncidentError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
