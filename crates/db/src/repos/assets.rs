//! Asset repository.

use crate::error::StoreResult;
use crate::models::{AssetRow, AssetStats};
use async_trait::async_trait;
use uuid::Uuid;

/// Repository for asset record operations.
#[async_trait]
pub trait AssetRepo: Send + Sync {
    /// Get an asset by its content key.
    async fn get_asset(&self, asset_key: &str) -> StoreResult<Option<AssetRow>>;

    /// All assets referenced by one update, launch asset first.
    async fn assets_for_update(&self, update_id: Uuid) -> StoreResult<Vec<AssetRow>>;

    /// Assets with zero remaining references.
    ///
    /// Reference counts are computed from the relation table on every call
    /// rather than tracked incrementally, so the result is consistent with
    /// whatever updates currently exist.
    async fn orphaned_assets(&self) -> StoreResult<Vec<AssetRow>>;

    /// Delete asset records. Returns the number of rows removed.
    async fn delete_assets(&self, asset_keys: &[String]) -> StoreResult<u64>;

    /// Asset table statistics.
    async fn asset_stats(&self) -> StoreResult<AssetStats>;
}
