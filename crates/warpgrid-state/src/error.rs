//! Error types for the WarpGrid cluster snapshot.

use thiserror::Error;

/// Result type alias for snapshot operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur while reading a cluster snapshot.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),
}

impl StateError {
    /// Whether this error reports a missing object.
    ///
    /// Scorers treat a missing node as a stale reference rather than a
    /// failure, since the snapshot may lag behind pod deletions.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StateError::NotFound(_))
    }
}
