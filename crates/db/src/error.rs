//! Update store error types.

use thiserror::Error;

/// Update store operation errors.
///
/// Any I/O failure on the underlying database surfaces as `Unavailable`;
/// callers must not assume partial success after one.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("constraint violation: {0}")]
    Constraint(String),
}

/// Result type for update store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
