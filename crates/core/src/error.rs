//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed manifest: {field}: {detail}")]
    MalformedManifest {
        field: &'static str,
        detail: String,
    },

    #[error("unrecognized manifest format: {0}")]
    UnrecognizedManifest(String),

    #[error("invalid hash: {0}")]
    InvalidHash(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Build a `MalformedManifest` error for a missing or mistyped field.
    pub fn malformed(field: &'static str, detail: impl Into<String>) -> Self {
        Self::MalformedManifest {
            field,
            detail: detail.into(),
        }
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
