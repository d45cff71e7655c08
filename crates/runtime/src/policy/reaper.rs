//! Reap selection strategies.

use super::ReaperSelectionPolicy;
use hangar_core::ManifestFilters;
use hangar_db::UpdateRow;

/// Deletes superseded updates while keeping one rollback safety update.
///
/// Only updates in the launched update's scope that are strictly older than
/// it are considered. Among those, the newest one still matching the
/// current filters is retained for fast rollback, falling back to the
/// newest older update overall when none match. The launched update itself
/// is never selected.
pub struct FilterAwareReaperPolicy;

impl ReaperSelectionPolicy for FilterAwareReaperPolicy {
    fn select_updates_to_delete(
        &self,
        updates: &[UpdateRow],
        launched: Option<&UpdateRow>,
        filters: &ManifestFilters,
    ) -> Vec<UpdateRow> {
        let Some(launched) = launched else {
            return Vec::new();
        };

        let older: Vec<&UpdateRow> = updates
            .iter()
            .filter(|u| {
                u.scope_key == launched.scope_key
                    && u.update_id != launched.update_id
                    && u.commit_time < launched.commit_time
            })
            .collect();

        let safety = older
            .iter()
            .filter(|u| filters.matches_raw(&u.manifest_json))
            .max_by_key(|u| u.commit_time)
            .or_else(|| older.iter().max_by_key(|u| u.commit_time))
            .map(|u| u.update_id);

        older
            .into_iter()
            .filter(|u| Some(u.update_id) != safety)
            .cloned()
            .collect()
    }
}

/// Evicts least-recently-used updates until the stored count fits a
/// configured maximum. Used for iterative development workflows where
/// updates accumulate quickly.
pub struct BoundedRetentionReaperPolicy {
    max_updates: usize,
}

impl BoundedRetentionReaperPolicy {
    pub fn new(max_updates: usize) -> Self {
        Self { max_updates }
    }
}

impl ReaperSelectionPolicy for BoundedRetentionReaperPolicy {
    fn select_updates_to_delete(
        &self,
        updates: &[UpdateRow],
        launched: Option<&UpdateRow>,
        _filters: &ManifestFilters,
    ) -> Vec<UpdateRow> {
        if updates.len() <= self.max_updates {
            return Vec::new();
        }

        let mut by_staleness: Vec<&UpdateRow> = updates.iter().collect();
        by_staleness.sort_by_key(|u| (u.last_accessed, u.commit_time));

        // Single eviction pass from the stale end. Skipping the launched
        // update (rather than stopping at it) keeps eviction moving, and
        // the pass terminates even when the launched update is the only
        // record left above the limit.
        let mut to_delete = Vec::new();
        let mut remaining = updates.len();
        for update in by_staleness {
            if remaining <= self.max_updates {
                break;
            }
            if launched.is_some_and(|l| l.update_id == update.update_id) {
                continue;
            }
            to_delete.push(update.clone());
            remaining -= 1;
        }
        to_delete
    }
}

/// Keeps only the newest update, ignoring filters entirely.
pub struct KeepNewestReaperPolicy;

impl ReaperSelectionPolicy for KeepNewestReaperPolicy {
    fn select_updates_to_delete(
        &self,
        updates: &[UpdateRow],
        launched: Option<&UpdateRow>,
        _filters: &ManifestFilters,
    ) -> Vec<UpdateRow> {
        let Some(newest) = updates.iter().max_by_key(|u| u.commit_time) else {
            return Vec::new();
        };
        updates
            .iter()
            .filter(|u| {
                u.commit_time < newest.commit_time
                    && !launched.is_some_and(|l| l.update_id == u.update_id)
            })
            .cloned()
            .collect()
    }
}
