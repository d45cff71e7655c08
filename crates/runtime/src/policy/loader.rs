//! Load-worthiness selection.

use super::LoaderSelectionPolicy;
use hangar_core::ManifestFilters;
use hangar_db::UpdateRow;

/// Decides whether a freshly fetched candidate should be persisted and
/// queued for the next launch.
///
/// Filter compliance is checked before recency, in this order:
/// 1. no candidate ⇒ false;
/// 2. candidate violates the server's current targeting ⇒ false;
/// 3. nothing launched yet ⇒ true;
/// 4. the launched update is itself out of compliance ⇒ true, regardless
///    of timestamps: an older but compliant candidate must not be starved
///    by comparing against a non-compliant incumbent;
/// 5. otherwise the candidate must be strictly newer.
pub struct FilterAwareLoaderPolicy;

impl LoaderSelectionPolicy for FilterAwareLoaderPolicy {
    fn should_load_new_update(
        &self,
        candidate: Option<&UpdateRow>,
        launched: Option<&UpdateRow>,
        filters: &ManifestFilters,
    ) -> bool {
        let Some(candidate) = candidate else {
            return false;
        };
        if !filters.matches_raw(&candidate.manifest_json) {
            return false;
        }
        let Some(launched) = launched else {
            return true;
        };
        if !filters.matches_raw(&launched.manifest_json) {
            return true;
        }
        candidate.commit_time > launched.commit_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::test_support::update_with;

    #[test]
    fn test_no_candidate_is_false() {
        let launched = update_with("app", "1.0", 0, None);
        assert!(!FilterAwareLoaderPolicy.should_load_new_update(
            None,
            Some(&launched),
            &ManifestFilters::empty()
        ));
    }

    #[test]
    fn test_without_launched_reduces_to_filter_match() {
        let matching = update_with("app", "1.0", 0, Some(("branch-name", "main")));
        let mismatched = update_with("app", "1.0", 0, Some(("branch-name", "beta")));
        let filters = ManifestFilters::from_pairs([("branch-name", "main")]);

        assert!(FilterAwareLoaderPolicy.should_load_new_update(Some(&matching), None, &filters));
        assert!(!FilterAwareLoaderPolicy.should_load_new_update(
            Some(&mismatched),
            None,
            &filters
        ));
    }

    #[test]
    fn test_noncompliant_incumbent_replaced_regardless_of_age() {
        // The candidate is older than the launched update, but the launched
        // update no longer matches the server's targeting.
        let candidate = update_with("app", "1.0", 0, Some(("branch-name", "main")));
        let launched = update_with("app", "1.0", 600, Some(("branch-name", "beta")));
        let filters = ManifestFilters::from_pairs([("branch-name", "main")]);

        assert!(FilterAwareLoaderPolicy.should_load_new_update(
            Some(&candidate),
            Some(&launched),
            &filters
        ));
    }

    #[test]
    fn test_compliant_incumbent_compared_by_commit_time() {
        let older = update_with("app", "1.0", 0, Some(("branch-name", "main")));
        let newer = update_with("app", "1.0", 600, Some(("branch-name", "main")));
        let filters = ManifestFilters::from_pairs([("branch-name", "main")]);

        assert!(FilterAwareLoaderPolicy.should_load_new_update(
            Some(&newer),
            Some(&older),
            &filters
        ));
        assert!(!FilterAwareLoaderPolicy.should_load_new_update(
            Some(&older),
            Some(&newer),
            &filters
        ));
        assert!(!FilterAwareLoaderPolicy.should_load_new_update(
            Some(&older),
            Some(&older),
            &filters
        ));
    }

    #[test]
    fn test_noncompliant_candidate_never_loaded() {
        let candidate = update_with("app", "1.0", 600, Some(("branch-name", "beta")));
        let launched = update_with("app", "1.0", 0, Some(("branch-name", "beta")));
        let filters = ManifestFilters::from_pairs([("branch-name", "main")]);

        // Even though the incumbent is equally non-compliant, a candidate
        // that violates current targeting is rejected first.
        assert!(!FilterAwareLoaderPolicy.should_load_new_update(
            Some(&candidate),
            Some(&launched),
            &filters
        ));
    }
}
