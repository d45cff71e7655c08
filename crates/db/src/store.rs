//! Update store trait and SQLite implementation.

use crate::error::{StoreError, StoreResult};
use crate::repos::{AssetRepo, UpdateRepo};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined update store trait.
#[async_trait]
pub trait UpdateStore: UpdateRepo + AssetRepo + Send + Sync {
    /// Create the schema if it does not exist yet.
    async fn migrate(&self) -> StoreResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> StoreResult<()>;
}

/// SQLite-based update store.
///
/// A single owning process per store directory is assumed; there is no
/// cross-process locking.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (creating if missing) an update store at the given path.
    pub async fn new(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors when the
            // launcher and reaper overlap.
            .busy_timeout(Duration::from_secs(5));

        Self::with_options(opts).await
    }

    /// Open an in-memory store. **For testing only.**
    pub async fn in_memory() -> StoreResult<Self> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        Self::with_options(opts).await
    }

    async fn with_options(opts: SqliteConnectOptions) -> StoreResult<Self> {
        // SQLite permits limited write concurrency; a single connection
        // avoids persistent lock failures when launch and reap overlap.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl UpdateStore for SqliteStore {
    async fn migrate(&self) -> StoreResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

mod sqlite_impl {
    use super::*;
    use crate::models::{AssetRow, AssetStats, UpdateRow};
    use time::OffsetDateTime;
    use uuid::Uuid;

    // SQLite caps bound parameters at ~999 per statement.
    const BATCH_SIZE: usize = 900;

    #[async_trait]
    impl UpdateRepo for SqliteStore {
        async fn insert_update(
            &self,
            update: &UpdateRow,
            assets: &[AssetRow],
        ) -> StoreResult<()> {
            let launch_assets = assets.iter().filter(|a| a.is_launch_asset).count();
            if launch_assets != 1 {
                return Err(StoreError::Constraint(format!(
                    "update {} must have exactly one launch asset, got {}",
                    update.update_id, launch_assets
                )));
            }

            let mut tx = self.pool.begin().await?;

            let inserted = sqlx::query(
                r#"
                INSERT OR IGNORE INTO updates (
                    update_id, commit_time, runtime_version, scope_key,
                    manifest_json, last_accessed
                ) VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(update.update_id)
            .bind(update.commit_time)
            .bind(&update.runtime_version)
            .bind(&update.scope_key)
            .bind(&update.manifest_json)
            .bind(update.last_accessed)
            .execute(&mut *tx)
            .await?;

            if inserted.rows_affected() == 0 {
                return Err(StoreError::Constraint(format!(
                    "update {} already exists",
                    update.update_id
                )));
            }

            for asset in assets {
                let result = sqlx::query(
                    r#"
                    INSERT OR IGNORE INTO assets (
                        asset_key, relative_path, content_type, is_launch_asset,
                        url, created_at
                    ) VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&asset.asset_key)
                .bind(&asset.relative_path)
                .bind(&asset.content_type)
                .bind(asset.is_launch_asset)
                .bind(&asset.url)
                .bind(asset.created_at)
                .execute(&mut *tx)
                .await?;

                // Dedup reuse: an existing record newly referenced as a
                // launch asset must carry the flag for both referents.
                if result.rows_affected() == 0 && asset.is_launch_asset {
                    sqlx::query("UPDATE assets SET is_launch_asset = 1 WHERE asset_key = ?")
                        .bind(&asset.asset_key)
                        .execute(&mut *tx)
                        .await?;
                }

                sqlx::query(
                    "INSERT OR IGNORE INTO updates_assets (update_id, asset_key) VALUES (?, ?)",
                )
                .bind(update.update_id)
                .bind(&asset.asset_key)
                .execute(&mut *tx)
                .await?;
            }

            tx.commit().await?;
            Ok(())
        }

        async fn list_updates_by_scope(&self, scope_key: &str) -> StoreResult<Vec<UpdateRow>> {
            let rows = sqlx::query_as::<_, UpdateRow>(
                "SELECT * FROM updates WHERE scope_key = ? ORDER BY commit_time DESC",
            )
            .bind(scope_key)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn get_update(&self, update_id: Uuid) -> StoreResult<Option<UpdateRow>> {
            let row = sqlx::query_as::<_, UpdateRow>("SELECT * FROM updates WHERE update_id = ?")
                .bind(update_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn touch_update(
            &self,
            update_id: Uuid,
            accessed_at: OffsetDateTime,
        ) -> StoreResult<()> {
            let result = sqlx::query("UPDATE updates SET last_accessed = ? WHERE update_id = ?")
                .bind(accessed_at)
                .bind(update_id)
                .execute(&self.pool)
                .await?;

            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound(format!(
                    "update {} not found",
                    update_id
                )));
            }
            Ok(())
        }

        async fn delete_updates(&self, update_ids: &[Uuid]) -> StoreResult<u64> {
            if update_ids.is_empty() {
                return Ok(0);
            }

            // One transaction for relation rows and update rows together;
            // a crash mid-delete must not leave dangling relations.
            let mut tx = self.pool.begin().await?;
            let mut deleted = 0u64;

            for batch in update_ids.chunks(BATCH_SIZE) {
                let placeholders: Vec<&str> = batch.iter().map(|_| "?").collect();
                let relation_query = format!(
                    "DELETE FROM updates_assets WHERE update_id IN ({})",
                    placeholders.join(", ")
                );
                let mut query = sqlx::query(&relation_query);
                for id in batch {
                    query = query.bind(id);
                }
                query.execute(&mut *tx).await?;

                let update_query = format!(
                    "DELETE FROM updates WHERE update_id IN ({})",
                    placeholders.join(", ")
                );
                let mut query = sqlx::query(&update_query);
                for id in batch {
                    query = query.bind(id);
                }
                deleted += query.execute(&mut *tx).await?.rows_affected();
            }

            tx.commit().await?;
            Ok(deleted)
        }

        async fn count_updates_by_scope(&self, scope_key: &str) -> StoreResult<u64> {
            let count: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM updates WHERE scope_key = ?")
                    .bind(scope_key)
                    .fetch_one(&self.pool)
                    .await?;
            Ok(count as u64)
        }
    }

    #[async_trait]
    impl AssetRepo for SqliteStore {
        async fn get_asset(&self, asset_key: &str) -> StoreResult<Option<AssetRow>> {
            let row = sqlx::query_as::<_, AssetRow>("SELECT * FROM assets WHERE asset_key = ?")
                .bind(asset_key)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn assets_for_update(&self, update_id: Uuid) -> StoreResult<Vec<AssetRow>> {
            let rows = sqlx::query_as::<_, AssetRow>(
                r#"
                SELECT a.* FROM assets a
                JOIN updates_assets ua ON ua.asset_key = a.asset_key
                WHERE ua.update_id = ?
                ORDER BY a.is_launch_asset DESC, a.asset_key
                "#,
            )
            .bind(update_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn orphaned_assets(&self) -> StoreResult<Vec<AssetRow>> {
            let rows = sqlx::query_as::<_, AssetRow>(
                r#"
                SELECT * FROM assets
                WHERE asset_key NOT IN (SELECT asset_key FROM updates_assets)
                ORDER BY created_at
                "#,
            )
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn delete_assets(&self, asset_keys: &[String]) -> StoreResult<u64> {
            if asset_keys.is_empty() {
                return Ok(0);
            }

            let mut deleted = 0u64;
            for batch in asset_keys.chunks(BATCH_SIZE) {
                let placeholders: Vec<&str> = batch.iter().map(|_| "?").collect();
                let delete_query = format!(
                    "DELETE FROM assets WHERE asset_key IN ({})",
                    placeholders.join(", ")
                );
                let mut query = sqlx::query(&delete_query);
                for key in batch {
                    query = query.bind(key);
                }
                deleted += query.execute(&self.pool).await?.rows_affected();
            }
            Ok(deleted)
        }

        async fn asset_stats(&self) -> StoreResult<AssetStats> {
            let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM assets")
                .fetch_one(&self.pool)
                .await?;
            let referenced: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM assets WHERE asset_key IN (SELECT asset_key FROM updates_assets)",
            )
            .fetch_one(&self.pool)
            .await?;

            Ok(AssetStats {
                count: total as u64,
                referenced_count: referenced as u64,
                orphaned_count: (total - referenced) as u64,
            })
        }
    }
}

const SCHEMA_SQL: &str = r#"
-- Update records, one per observed bundle
CREATE TABLE IF NOT EXISTS updates (
    update_id BLOB PRIMARY KEY,
    commit_time TEXT NOT NULL,
    runtime_version TEXT NOT NULL,
    scope_key TEXT NOT NULL,
    manifest_json TEXT NOT NULL,
    last_accessed TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_updates_scope ON updates(scope_key, commit_time);

-- Content-addressed asset records, shared between updates
CREATE TABLE IF NOT EXISTS assets (
    asset_key TEXT PRIMARY KEY,
    relative_path TEXT NOT NULL,
    content_type TEXT,
    is_launch_asset INTEGER NOT NULL DEFAULT 0,
    url TEXT,
    created_at TEXT NOT NULL
);

-- Many-to-many relation between updates and assets
CREATE TABLE IF NOT EXISTS updates_assets (
    update_id BLOB NOT NULL REFERENCES updates(update_id),
    asset_key TEXT NOT NULL REFERENCES assets(asset_key),
    PRIMARY KEY (update_id, asset_key)
);
CREATE INDEX IF NOT EXISTS idx_updates_assets_key ON updates_assets(asset_key);
"#;
