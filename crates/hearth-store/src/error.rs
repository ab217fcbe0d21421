use hearth_shared::error::{IdError, ReactionKeyError};
use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Caller input was rejected (empty text, malformed member list, ...).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The caller is not allowed to act on the referenced record.
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// A referenced conversation or message does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A uniqueness race could not be resolved by re-reading.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// UUID parsing error.
    #[error("UUID error: {0}")]
    Uuid(#[from] uuid::Error),

    /// A stored reaction key could not be decoded.
    #[error("Reaction key error: {0}")]
    Reaction(#[from] ReactionKeyError),
}

impl From<IdError> for StoreError {
    fn from(e: IdError) -> Self {
        StoreError::Validation(e.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
