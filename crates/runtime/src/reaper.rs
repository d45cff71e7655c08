//! Background storage reclamation.

use crate::policy::SelectionPolicy;
use hangar_assets::AssetFileStore;
use hangar_core::ManifestFilters;
use hangar_db::{AssetRepo, UpdateRepo, UpdateRow, UpdateStore};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Result of one reap run.
#[derive(Debug, Clone, Default)]
pub struct ReapStats {
    /// Update records deleted.
    pub updates_deleted: u64,
    /// Orphaned asset records deleted.
    pub assets_deleted: u64,
    /// Orphaned asset files removed from disk.
    pub files_removed: u64,
    /// Errors encountered (logged, never fatal).
    pub errors: u64,
}

/// What the background reap loop needs to know about the current launch.
#[derive(Clone, Debug, Default)]
pub struct ReapContext {
    pub launched: Option<UpdateRow>,
    pub filters: ManifestFilters,
}

/// Deletes disposable updates and garbage-collects orphaned assets.
///
/// Reclamation is best-effort: every failure is logged and counted, and a
/// failed run leaves disk usage higher than optimal but never corrupts the
/// store or harms the currently launched update (the reap policy never
/// selects it).
pub struct Reaper {
    store: Arc<dyn UpdateStore>,
    files: Arc<AssetFileStore>,
    policy: Arc<SelectionPolicy>,
}

impl Reaper {
    pub fn new(
        store: Arc<dyn UpdateStore>,
        files: Arc<AssetFileStore>,
        policy: Arc<SelectionPolicy>,
    ) -> Self {
        Self {
            store,
            files,
            policy,
        }
    }

    /// Run one reclamation pass over a scope.
    #[instrument(skip(self, launched, filters))]
    pub async fn reap(
        &self,
        scope_key: &str,
        launched: Option<&UpdateRow>,
        filters: &ManifestFilters,
    ) -> ReapStats {
        let mut stats = ReapStats::default();

        let updates = match self.store.list_updates_by_scope(scope_key).await {
            Ok(updates) => updates,
            Err(e) => {
                warn!(error = %e, "reap skipped: failed to list updates");
                stats.errors += 1;
                return stats;
            }
        };

        let doomed = self
            .policy
            .reaper
            .select_updates_to_delete(&updates, launched, filters);
        if !doomed.is_empty() {
            let ids: Vec<Uuid> = doomed.iter().map(|u| u.update_id).collect();
            match self.store.delete_updates(&ids).await {
                Ok(deleted) => stats.updates_deleted = deleted,
                Err(e) => {
                    warn!(error = %e, "reap failed to delete updates");
                    stats.errors += 1;
                    return stats;
                }
            }
        }

        // Orphans are collected even when nothing was deleted above: an
        // earlier failed run may have left some behind.
        self.collect_orphans(&mut stats).await;

        info!(
            updates_deleted = stats.updates_deleted,
            assets_deleted = stats.assets_deleted,
            errors = stats.errors,
            "reap finished"
        );
        stats
    }

    async fn collect_orphans(&self, stats: &mut ReapStats) {
        let orphans = match self.store.orphaned_assets().await {
            Ok(orphans) => orphans,
            Err(e) => {
                warn!(error = %e, "reap failed to list orphaned assets");
                stats.errors += 1;
                return;
            }
        };

        // Remove each orphan's file first and only drop rows whose file is
        // gone; a row kept on file-removal failure is retried next run.
        let mut removable = Vec::with_capacity(orphans.len());
        for asset in &orphans {
            match self.files.remove(&asset.relative_path).await {
                Ok(()) => {
                    stats.files_removed += 1;
                    removable.push(asset.asset_key.clone());
                }
                Err(e) => {
                    warn!(asset_key = %asset.asset_key, error = %e, "failed to remove asset file");
                    stats.errors += 1;
                }
            }
        }

        if !removable.is_empty() {
            match self.store.delete_assets(&removable).await {
                Ok(deleted) => stats.assets_deleted = deleted,
                Err(e) => {
                    warn!(error = %e, "reap failed to delete asset records");
                    stats.errors += 1;
                }
            }
        }
    }
}

/// Periodic background reap loop.
///
/// Runs until the cancellation token fires. The context is re-read on every
/// tick so launches and filter replacements between ticks take effect.
pub async fn run_reap_task(
    reaper: Arc<Reaper>,
    scope_key: String,
    context: Arc<RwLock<ReapContext>>,
    interval: std::time::Duration,
    cancellation: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick fires immediately; skip it so a fresh start is not
    // reaped before anything launched.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancellation.cancelled() => {
                info!("reap task stopped");
                return;
            }
            _ = ticker.tick() => {
                let ctx = context.read().await.clone();
                let stats = reaper
                    .reap(&scope_key, ctx.launched.as_ref(), &ctx.filters)
                    .await;
                debug!(?stats, "periodic reap tick");
            }
        }
    }
}
