//! Error types for state store operations.

use thiserror::Error;

/// Result type alias for state store operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur during state store operations.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("entry '{0}' not found")]
    NotFound(String),

    #[error("version conflict on '{id}': supplied {supplied:?}, stored {stored:?}")]
    Conflict {
        id: String,
        supplied: String,
        stored: String,
    },

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl StateError {
    /// NotFound is recoverable for most callers (lease checks proceed,
    /// deletes treat it as already-gone), so it gets a cheap test.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StateError::NotFound(_))
    }
}
