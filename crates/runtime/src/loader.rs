//! Decides whether a fetched manifest is worth persisting for next launch.

use crate::error::LoadError;
use crate::policy::SelectionPolicy;
use hangar_core::{normalize_manifest, ManifestFilters, NormalizedUpdate, UpdatesConfig};
use hangar_db::{AssetRow, UpdateRepo, UpdateRow, UpdateStore};
use serde_json::Value;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{debug, instrument};

/// The result of offering a candidate manifest to the loader.
#[derive(Clone, Debug)]
pub enum LoadOutcome {
    /// Candidate persisted; it becomes a launch candidate next start.
    Stored(UpdateRow),
    /// Candidate was already in the store.
    AlreadyStored(UpdateRow),
    /// The load policy declined the candidate.
    Declined,
}

/// Normalizes candidate manifests and persists the worthwhile ones.
pub struct Loader {
    store: Arc<dyn UpdateStore>,
    policy: Arc<SelectionPolicy>,
    config: UpdatesConfig,
}

impl Loader {
    pub fn new(
        store: Arc<dyn UpdateStore>,
        policy: Arc<SelectionPolicy>,
        config: UpdatesConfig,
    ) -> Self {
        Self {
            store,
            policy,
            config,
        }
    }

    /// Normalize a raw manifest and persist it if the load policy accepts
    /// it against the currently launched update and filter set.
    #[instrument(skip_all)]
    pub async fn load(
        &self,
        raw_manifest: &Value,
        filters: &ManifestFilters,
        launched: Option<&UpdateRow>,
    ) -> Result<LoadOutcome, LoadError> {
        let normalized = normalize_manifest(raw_manifest, &self.config)?;

        if let Some(existing) = self.store.get_update(normalized.update.id).await? {
            debug!(update_id = %existing.update_id, "candidate already stored");
            return Ok(LoadOutcome::AlreadyStored(existing));
        }

        let (update, assets) = update_rows(&normalized, OffsetDateTime::now_utc());
        if !self
            .policy
            .loader
            .should_load_new_update(Some(&update), launched, filters)
        {
            debug!(update_id = %update.update_id, "load policy declined candidate");
            return Ok(LoadOutcome::Declined);
        }

        self.store.insert_update(&update, &assets).await?;
        debug!(update_id = %update.update_id, "candidate stored for next launch");
        Ok(LoadOutcome::Stored(update))
    }

    /// Convenience wrapper taking the raw filter header from a manifest
    /// response.
    pub async fn load_from_response(
        &self,
        raw_manifest: &Value,
        filter_header: Option<&str>,
        launched: Option<&UpdateRow>,
    ) -> Result<LoadOutcome, LoadError> {
        let filters = ManifestFilters::parse_header(filter_header);
        self.load(raw_manifest, &filters, launched).await
    }
}

/// Convert a normalized update into store rows.
pub fn update_rows(
    normalized: &NormalizedUpdate,
    now: OffsetDateTime,
) -> (UpdateRow, Vec<AssetRow>) {
    let update = UpdateRow {
        update_id: normalized.update.id,
        commit_time: normalized.update.commit_time,
        runtime_version: normalized.update.runtime_version.clone(),
        scope_key: normalized.update.scope_key.clone(),
        manifest_json: normalized.update.manifest.to_string(),
        last_accessed: now,
    };
    let assets = normalized
        .assets
        .iter()
        .map(|asset| AssetRow {
            asset_key: asset.key.clone(),
            relative_path: asset.relative_path.clone(),
            content_type: asset.content_type.clone(),
            is_launch_asset: asset.is_launch_asset,
            url: asset.url.clone(),
            created_at: now,
        })
        .collect();
    (update, assets)
}
