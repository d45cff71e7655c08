//! Turns a chosen update record into a runnable bundle.

use crate::error::LaunchError;
use hangar_assets::{AssetFileStore, RemoteSource};
use hangar_core::AssetHash;
use hangar_db::{AssetRepo, AssetRow, UpdateRepo, UpdateRow, UpdateStore};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{debug, instrument};
use uuid::Uuid;

/// A locally runnable bundle: every required asset is on disk.
#[derive(Clone, Debug)]
pub struct LaunchedBundle {
    pub update_id: Uuid,
    /// Local path of the entry bundle.
    pub launch_asset_path: PathBuf,
    /// Local path of every asset, keyed by asset key.
    pub asset_paths: HashMap<String, PathBuf>,
}

/// Materializes update assets on local disk, downloading on demand.
pub struct Launcher {
    store: Arc<dyn UpdateStore>,
    files: Arc<AssetFileStore>,
    remote: Arc<dyn RemoteSource>,
}

impl Launcher {
    pub fn new(
        store: Arc<dyn UpdateStore>,
        files: Arc<AssetFileStore>,
        remote: Arc<dyn RemoteSource>,
    ) -> Self {
        Self {
            store,
            files,
            remote,
        }
    }

    /// Ensure every asset of `update` exists locally and report the
    /// runnable bundle.
    ///
    /// Idempotent: assets already on disk are not fetched again, so calling
    /// this twice for the same update is safe. On any asset failure the
    /// error identifies the failing asset and nothing is partially
    /// launched. Download failures are not retried here; retry policy
    /// belongs to the transport behind [`RemoteSource`].
    #[instrument(skip(self, update), fields(update_id = %update.update_id))]
    pub async fn launch(&self, update: &UpdateRow) -> Result<LaunchedBundle, LaunchError> {
        let assets = self.store.assets_for_update(update.update_id).await?;

        let mut launch_asset_path = None;
        let mut asset_paths = HashMap::with_capacity(assets.len());
        for asset in &assets {
            let path = self.materialize(asset).await?;
            if asset.is_launch_asset && launch_asset_path.is_none() {
                launch_asset_path = Some(path.clone());
            }
            asset_paths.insert(asset.asset_key.clone(), path);
        }

        let Some(launch_asset_path) = launch_asset_path else {
            return Err(LaunchError::AssetUnavailable {
                asset_key: update.update_id.to_string(),
                url: None,
                reason: "update has no launch asset".to_string(),
            });
        };

        self.store
            .touch_update(update.update_id, OffsetDateTime::now_utc())
            .await?;

        Ok(LaunchedBundle {
            update_id: update.update_id,
            launch_asset_path,
            asset_paths,
        })
    }

    /// Ensure one asset exists locally, fetching it if needed.
    async fn materialize(&self, asset: &AssetRow) -> Result<PathBuf, LaunchError> {
        if self.files.contains(&asset.relative_path).await? {
            return Ok(self.files.local_path(&asset.relative_path)?);
        }

        let Some(url) = &asset.url else {
            return Err(LaunchError::AssetUnavailable {
                asset_key: asset.asset_key.clone(),
                url: None,
                reason: "no local file and no remote url".to_string(),
            });
        };

        debug!(asset_key = %asset.asset_key, url, "downloading missing asset");
        let data =
            self.remote
                .fetch(url)
                .await
                .map_err(|e| LaunchError::AssetUnavailable {
                    asset_key: asset.asset_key.clone(),
                    url: Some(url.clone()),
                    reason: e.to_string(),
                })?;

        // Asset keys that are content hashes are verified against the
        // downloaded bytes; opaque manifest-supplied keys cannot be.
        if let Ok(expected) = AssetHash::from_hex(&asset.asset_key) {
            let actual = AssetHash::compute(&data);
            if actual != expected {
                return Err(LaunchError::AssetUnavailable {
                    asset_key: asset.asset_key.clone(),
                    url: Some(url.clone()),
                    reason: format!("content hash mismatch: expected {expected}, got {actual}"),
                });
            }
        }

        Ok(self.files.write(&asset.relative_path, data).await?)
    }
}
