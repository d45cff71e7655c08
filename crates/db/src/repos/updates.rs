//! Update repository.

use crate::error::StoreResult;
use crate::models::{AssetRow, UpdateRow};
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

/// Repository for update record operations.
#[async_trait]
pub trait UpdateRepo: Send + Sync {
    /// Persist an update together with its assets, atomically.
    ///
    /// An asset whose key already exists is reused (a relation row is added
    /// to the existing record) rather than duplicated. A partially written
    /// update is never visible to readers: the update row, asset rows, and
    /// relation rows commit in one transaction or not at all.
    ///
    /// Exactly one of `assets` must be the launch asset.
    async fn insert_update(&self, update: &UpdateRow, assets: &[AssetRow]) -> StoreResult<()>;

    /// All updates in a scope, newest commit first.
    async fn list_updates_by_scope(&self, scope_key: &str) -> StoreResult<Vec<UpdateRow>>;

    /// Load a single update by id.
    async fn get_update(&self, update_id: Uuid) -> StoreResult<Option<UpdateRow>>;

    /// Bump an update's `last_accessed` timestamp.
    async fn touch_update(
        &self,
        update_id: Uuid,
        accessed_at: OffsetDateTime,
    ) -> StoreResult<()>;

    /// Delete update rows and their relation rows.
    ///
    /// Does not delete assets; orphan collection is the reaper's job, which
    /// keeps reference counting in one place. Returns the number of update
    /// rows removed.
    async fn delete_updates(&self, update_ids: &[Uuid]) -> StoreResult<u64>;

    /// Number of updates in a scope.
    async fn count_updates_by_scope(&self, scope_key: &str) -> StoreResult<u64>;
}
