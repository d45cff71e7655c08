//! Runtime facade wiring the store, policies, launcher, loader, and reaper.

use crate::error::{LaunchError, LoadError};
use crate::launcher::{LaunchedBundle, Launcher};
use crate::loader::{LoadOutcome, Loader};
use crate::policy::SelectionPolicy;
use crate::reaper::{ReapContext, ReapStats, Reaper};
use hangar_assets::{AssetFileStore, RemoteSource};
use hangar_core::{normalize_manifest, ManifestFilters, UpdatesConfig};
use hangar_db::{UpdateRepo, UpdateRow, UpdateStore};
use serde_json::Value;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

/// The host-facing surface of the update core.
///
/// Holds the currently launched update and the last seen filter set, and
/// routes the host's three entry points (launch at startup, a fetched
/// manifest response, periodic reclamation) through the injected
/// selection policy.
pub struct UpdatesController {
    config: UpdatesConfig,
    policy: Arc<SelectionPolicy>,
    store: Arc<dyn UpdateStore>,
    launcher: Launcher,
    loader: Loader,
    reaper: Arc<Reaper>,
    context: Arc<RwLock<ReapContext>>,
}

impl UpdatesController {
    /// Wire a controller with the policy set derived from configuration.
    pub fn new(
        config: UpdatesConfig,
        store: Arc<dyn UpdateStore>,
        files: Arc<AssetFileStore>,
        remote: Arc<dyn RemoteSource>,
    ) -> Self {
        let policy = Arc::new(SelectionPolicy::from_config(&config));
        Self::with_policy(config, policy, store, files, remote)
    }

    /// Wire a controller with an explicit policy set.
    pub fn with_policy(
        config: UpdatesConfig,
        policy: Arc<SelectionPolicy>,
        store: Arc<dyn UpdateStore>,
        files: Arc<AssetFileStore>,
        remote: Arc<dyn RemoteSource>,
    ) -> Self {
        let launcher = Launcher::new(store.clone(), files.clone(), remote);
        let loader = Loader::new(store.clone(), policy.clone(), config.clone());
        let reaper = Arc::new(Reaper::new(store.clone(), files, policy.clone()));
        Self {
            config,
            policy,
            store,
            launcher,
            loader,
            reaper,
            context: Arc::new(RwLock::new(ReapContext::default())),
        }
    }

    /// Pick and launch the best stored update at process start.
    ///
    /// Returns None when no stored update survives selection; the host
    /// then falls back to its embedded bundle. Must complete (or fail
    /// fast) before the host proceeds.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<Option<LaunchedBundle>, LaunchError> {
        let updates = self
            .store
            .list_updates_by_scope(&self.config.scope_key)
            .await?;
        let filters = self.context.read().await.filters.clone();

        let Some(selected) = self
            .policy
            .launcher
            .select_update_to_launch(&updates, &filters)
        else {
            info!("no stored update is launchable");
            return Ok(None);
        };

        let bundle = self.launcher.launch(selected).await?;
        self.context.write().await.launched = Some(selected.clone());
        info!(update_id = %selected.update_id, "launched stored update");
        Ok(Some(bundle))
    }

    /// Offer a fetched manifest response to the loader.
    ///
    /// The response's filter header fully replaces the previously stored
    /// filter set before the load decision is made.
    #[instrument(skip(self, raw_manifest))]
    pub async fn on_manifest_response(
        &self,
        raw_manifest: &Value,
        filter_header: Option<&str>,
    ) -> Result<LoadOutcome, LoadError> {
        let filters = ManifestFilters::parse_header(filter_header);
        let launched = {
            let mut context = self.context.write().await;
            context.filters = filters.clone();
            context.launched.clone()
        };
        self.loader
            .load(raw_manifest, &filters, launched.as_ref())
            .await
    }

    /// Persist the build-time embedded manifest if it is not stored yet.
    ///
    /// Gives a first run (or a run whose downloaded updates were all
    /// reclaimed) a launchable record without touching the network.
    pub async fn seed_embedded(&self, raw_manifest: &Value) -> Result<LoadOutcome, LoadError> {
        let normalized = normalize_manifest(raw_manifest, &self.config)?;
        if let Some(existing) = self.store.get_update(normalized.update.id).await? {
            return Ok(LoadOutcome::AlreadyStored(existing));
        }
        let (update, assets) = crate::loader::update_rows(&normalized, OffsetDateTime::now_utc());
        self.store.insert_update(&update, &assets).await?;
        debug!(update_id = %update.update_id, "seeded embedded update");
        Ok(LoadOutcome::Stored(update))
    }

    /// Run one reclamation pass for this controller's scope.
    pub async fn reap(&self) -> ReapStats {
        let ctx = self.context.read().await.clone();
        self.reaper
            .reap(&self.config.scope_key, ctx.launched.as_ref(), &ctx.filters)
            .await
    }

    /// The currently launched update, if any.
    pub async fn launched(&self) -> Option<UpdateRow> {
        self.context.read().await.launched.clone()
    }

    /// The filter set from the most recent manifest response.
    pub async fn filters(&self) -> ManifestFilters {
        self.context.read().await.filters.clone()
    }

    /// Handles for driving the background reap loop via
    /// [`crate::reaper::run_reap_task`].
    pub fn reap_handles(&self) -> (Arc<Reaper>, Arc<RwLock<ReapContext>>) {
        (self.reaper.clone(), self.context.clone())
    }

    /// The controller's configuration.
    pub fn config(&self) -> &UpdatesConfig {
        &self.config
    }
}
