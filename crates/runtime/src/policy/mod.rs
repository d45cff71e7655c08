//! Selection policies: which update to launch, load, and delete.
//!
//! Three independent strategies, each swappable behind a small trait and
//! aggregated in [`SelectionPolicy`]. The aggregate is passed explicitly to
//! the launcher, loader, and reaper; there is no global policy singleton.

pub mod launcher;
pub mod loader;
pub mod reaper;

pub use launcher::{FilterAwareLauncherPolicy, NewestLauncherPolicy};
pub use loader::FilterAwareLoaderPolicy;
pub use reaper::{BoundedRetentionReaperPolicy, FilterAwareReaperPolicy, KeepNewestReaperPolicy};

use hangar_core::{ManifestFilters, UpdatesConfig};
use hangar_db::UpdateRow;

/// Strategy picking the update to run at process start.
pub trait LauncherSelectionPolicy: Send + Sync {
    /// The best launch candidate among `updates`, or None if no candidate
    /// survives filtering. Absence is a normal result, not an error.
    fn select_update_to_launch<'a>(
        &self,
        updates: &'a [UpdateRow],
        filters: &ManifestFilters,
    ) -> Option<&'a UpdateRow>;
}

/// Strategy deciding whether a freshly fetched candidate is worth storing.
pub trait LoaderSelectionPolicy: Send + Sync {
    fn should_load_new_update(
        &self,
        candidate: Option<&UpdateRow>,
        launched: Option<&UpdateRow>,
        filters: &ManifestFilters,
    ) -> bool;
}

/// Strategy choosing which stored updates are disposable.
pub trait ReaperSelectionPolicy: Send + Sync {
    /// Updates safe to delete. Must never include `launched`: the launcher
    /// and reaper may run concurrently, and this invariant is what makes
    /// that safe.
    fn select_updates_to_delete(
        &self,
        updates: &[UpdateRow],
        launched: Option<&UpdateRow>,
        filters: &ManifestFilters,
    ) -> Vec<UpdateRow>;
}

/// The three strategies used by one runtime, injected together.
pub struct SelectionPolicy {
    pub launcher: Box<dyn LauncherSelectionPolicy>,
    pub loader: Box<dyn LoaderSelectionPolicy>,
    pub reaper: Box<dyn ReaperSelectionPolicy>,
}

impl SelectionPolicy {
    /// The default policy set: filter-aware launch and load, one rollback
    /// safety update retained on reap.
    pub fn filter_aware(runtime_versions: Vec<String>) -> Self {
        Self {
            launcher: Box::new(FilterAwareLauncherPolicy::new(runtime_versions)),
            loader: Box::new(FilterAwareLoaderPolicy),
            reaper: Box::new(FilterAwareReaperPolicy),
        }
    }

    /// Newest-wins everywhere, ignoring filters and runtime versions. For
    /// pinned single-update contexts where targeting is unnecessary.
    pub fn newest() -> Self {
        Self {
            launcher: Box::new(NewestLauncherPolicy),
            loader: Box::new(FilterAwareLoaderPolicy),
            reaper: Box::new(KeepNewestReaperPolicy),
        }
    }

    /// Filter-aware launch and load with LRU bounded retention on reap.
    /// Suited to iterative development workflows that accumulate updates
    /// quickly.
    pub fn bounded(runtime_versions: Vec<String>, max_updates: usize) -> Self {
        Self {
            launcher: Box::new(FilterAwareLauncherPolicy::new(runtime_versions)),
            loader: Box::new(FilterAwareLoaderPolicy),
            reaper: Box::new(BoundedRetentionReaperPolicy::new(max_updates)),
        }
    }

    /// Derive the policy set from configuration.
    pub fn from_config(config: &UpdatesConfig) -> Self {
        let versions = config.accepted_runtime_versions();
        match config.max_retained_updates {
            Some(max) => Self::bounded(versions, max as usize),
            None => Self::filter_aware(versions),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use hangar_db::UpdateRow;
    use time::{Duration, OffsetDateTime};
    use uuid::Uuid;

    /// Build an update row with the given scope, runtime version, commit
    /// offset (seconds past the epoch), and optional metadata pair.
    pub fn update_with(
        scope_key: &str,
        runtime_version: &str,
        commit_offset_secs: i64,
        metadata: Option<(&str, &str)>,
    ) -> UpdateRow {
        let manifest_json = match metadata {
            Some((key, value)) => format!(r#"{{"metadata":{{"{key}":"{value}"}}}}"#),
            None => "{}".to_string(),
        };
        UpdateRow {
            update_id: Uuid::new_v4(),
            commit_time: OffsetDateTime::UNIX_EPOCH + Duration::seconds(commit_offset_secs),
            runtime_version: runtime_version.to_string(),
            scope_key: scope_key.to_string(),
            manifest_json,
            last_accessed: OffsetDateTime::UNIX_EPOCH,
        }
    }

    /// Build an update row with distinct commit and last-accessed offsets.
    pub fn update_with_access(
        scope_key: &str,
        commit_offset_secs: i64,
        accessed_offset_secs: i64,
    ) -> UpdateRow {
        let mut update = update_with(scope_key, "1.0", commit_offset_secs, None);
        update.last_accessed = OffsetDateTime::UNIX_EPOCH + Duration::seconds(accessed_offset_secs);
        update
    }
}
