//! Error types for the persistence adapter.

use thiserror::Error;

/// Result type alias for persistence operations.
pub type PersistResult<T> = Result<T, PersistError>;

/// Errors that can occur while talking to the durable store.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to prepare database directory: {0}")]
    Prepare(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("domain not found: {0}")]
    NotFound(String),
}
