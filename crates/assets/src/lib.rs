//! Asset storage for hangar.
//!
//! This crate provides:
//! - A content-addressed local file store with atomic writes, keyed by
//!   asset storage key
//! - The `RemoteSource` seam behind which the host supplies its fetch
//!   primitive (transport and retry policy are not this core's concern)

pub mod error;
pub mod filesystem;
pub mod traits;

pub use error::{AssetStoreError, AssetStoreResult, RemoteError};
pub use filesystem::AssetFileStore;
pub use traits::RemoteSource;
