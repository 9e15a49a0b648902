//! Error types for the sync layer.

use cns_types::PathError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
///
/// The first four variants are local, recoverable failures: when one of them
/// is returned no mutation has been committed.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A path, context or profile does not resolve.
    #[error("not found: {0}")]
    NotFound(String),

    /// The write targets an immutable region or the wrong context.
    #[error("read only: {0}")]
    ReadOnly(String),

    /// Object/scalar shape conflict.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// The update introduces keys absent from the target subtree.
    #[error("containment violation: {0}")]
    ContainmentViolation(String),

    /// Malformed path.
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),

    /// Network error talking to a collaborator.
    #[error("network error: {0}")]
    Network(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Channel closed.
    #[error("channel closed")]
    ChannelClosed,
}

impl SyncError {
    /// Whether the error was raised by local validation rather than I/O.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SyncError::NotFound(_)
                | SyncError::ReadOnly(_)
                | SyncError::TypeMismatch(_)
                | SyncError::ContainmentViolation(_)
                | SyncError::InvalidPath(_)
        )
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        SyncError::Network(e.to_string())
    }
}
