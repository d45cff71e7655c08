//! Launch selection strategies.

use super::LauncherSelectionPolicy;
use hangar_core::ManifestFilters;
use hangar_db::UpdateRow;

/// Picks the newest update whose runtime version is accepted by the host
/// and whose manifest matches the current server filters.
pub struct FilterAwareLauncherPolicy {
    runtime_versions: Vec<String>,
}

impl FilterAwareLauncherPolicy {
    pub fn new(runtime_versions: Vec<String>) -> Self {
        Self { runtime_versions }
    }
}

impl LauncherSelectionPolicy for FilterAwareLauncherPolicy {
    fn select_update_to_launch<'a>(
        &self,
        updates: &'a [UpdateRow],
        filters: &ManifestFilters,
    ) -> Option<&'a UpdateRow> {
        let mut chosen: Option<&UpdateRow> = None;
        for update in updates {
            if !self.runtime_versions.contains(&update.runtime_version) {
                continue;
            }
            if !filters.matches_raw(&update.manifest_json) {
                continue;
            }
            match chosen {
                Some(best) if update.commit_time <= best.commit_time => {}
                _ => chosen = Some(update),
            }
        }
        chosen
    }
}

/// Picks the newest update outright, ignoring filters and runtime
/// versions. Interchangeable with the filter-aware strategy in contexts
/// (pinned single-update mode) where filtering is unnecessary.
pub struct NewestLauncherPolicy;

impl LauncherSelectionPolicy for NewestLauncherPolicy {
    fn select_update_to_launch<'a>(
        &self,
        updates: &'a [UpdateRow],
        _filters: &ManifestFilters,
    ) -> Option<&'a UpdateRow> {
        updates.iter().max_by_key(|u| u.commit_time)
    }
}
