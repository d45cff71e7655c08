//! Asset storage error types.

use thiserror::Error;

/// Asset file store operation errors.
#[derive(Debug, Error)]
pub enum AssetStoreError {
    #[error("asset not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid asset key: {0}")]
    InvalidKey(String),
}

/// Result type for asset store operations.
pub type AssetStoreResult<T> = std::result::Result<T, AssetStoreError>;

/// Remote fetch errors, produced by the externally supplied transport.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("fetch failed for {url}: {reason}")]
    FetchFailed { url: String, reason: String },
}
