//! Runtime error types.

use thiserror::Error;

/// Launcher operation errors.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// A required asset could not be materialized locally. Identifies which
    /// asset failed so the caller can choose a fallback; nothing is
    /// partially launched.
    #[error("asset {asset_key} unavailable{}: {reason}", url_suffix(.url))]
    AssetUnavailable {
        asset_key: String,
        url: Option<String>,
        reason: String,
    },

    #[error(transparent)]
    Store(#[from] hangar_db::StoreError),

    #[error(transparent)]
    AssetStore(#[from] hangar_assets::AssetStoreError),
}

fn url_suffix(url: &Option<String>) -> String {
    match url {
        Some(url) => format!(" ({url})"),
        None => String::new(),
    }
}

/// Loader operation errors.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Manifest(#[from] hangar_core::Error),

    #[error(transparent)]
    Store(#[from] hangar_db::StoreError),
}
