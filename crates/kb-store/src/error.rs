//! Storage error types.

use thiserror::Error;

/// Errors from storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error from a durable backend.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A backend-specific failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;
