//! Database models mapping to the update store schema.

use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// One observed, downloadable application bundle.
///
/// Created when a manifest is normalized and persisted; mutated only to
/// bump `last_accessed`; destroyed only by the reaper.
#[derive(Debug, Clone, FromRow)]
pub struct UpdateRow {
    pub update_id: Uuid,
    /// Publisher-assigned creation timestamp; "newest wins" tie-breaker.
    pub commit_time: OffsetDateTime,
    pub runtime_version: String,
    /// Partition key; all store queries are scoped by it.
    pub scope_key: String,
    /// The normalized manifest body, including the `metadata` sub-object
    /// used for filter matching.
    pub manifest_json: String,
    /// Bumped every time this update is launched.
    pub last_accessed: OffsetDateTime,
}

/// One content-addressed file referenced by one or more updates.
#[derive(Debug, Clone, FromRow)]
pub struct AssetRow {
    /// Content hash; primary dedup key. Two updates referencing
    /// byte-identical content share one row.
    pub asset_key: String,
    /// Local storage key relative to the asset directory.
    pub relative_path: String,
    pub content_type: Option<String>,
    /// Whether this asset is an entry bundle for some update.
    pub is_launch_asset: bool,
    /// Remote download URL. None for embedded assets.
    pub url: Option<String>,
    pub created_at: OffsetDateTime,
}

/// Relation row linking an update to one of its assets.
#[derive(Debug, Clone, FromRow)]
pub struct UpdateAssetRow {
    pub update_id: Uuid,
    pub asset_key: String,
}

/// Asset table statistics.
#[derive(Debug, Clone, Default)]
pub struct AssetStats {
    /// Total number of asset records.
    pub count: u64,
    /// Number of assets referenced by at least one update.
    pub referenced_count: u64,
    /// Number of assets no surviving update references.
    pub orphaned_count: u64,
}
