//! Server-supplied manifest filters and the shared matching primitive.
//!
//! Filters arrive as a single response header whose value is a
//! comma-separated list of `key="value"` pairs. Every selection policy
//! compares them against the `metadata` object of a stored manifest.

use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// An opaque map of lowercase string keys to string values used to narrow
/// candidate updates (e.g. a rollout branch name).
///
/// A new response's filter set fully replaces the previously stored one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ManifestFilters(BTreeMap<String, String>);

impl ManifestFilters {
    /// An empty filter set, which matches every update.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a filter set from key/value pairs. Keys are lowercased.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into().to_lowercase(), v.into()))
                .collect(),
        )
    }

    /// Parse the filter header value. An absent or empty header yields the
    /// empty filter set. Pairs that do not parse are skipped with a warning
    /// rather than failing the whole set.
    pub fn parse_header(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::empty();
        };
        let mut map = BTreeMap::new();
        for pair in raw.split(',') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            let Some((key, value)) = pair.split_once('=') else {
                warn!(pair, "skipping unparseable manifest filter pair");
                continue;
            };
            let key = key.trim().to_lowercase();
            if key.is_empty() {
                warn!(pair, "skipping manifest filter pair with empty key");
                continue;
            }
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            map.insert(key, value.to_string());
        }
        Self(map)
    }

    /// Whether no filters are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Look up a filter value by (lowercase) key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(&key.to_lowercase()).map(String::as_str)
    }

    /// Check a manifest body against this filter set.
    ///
    /// Field matching is case-insensitive on metadata keys. A key present in
    /// the filters but absent from the metadata does not fail the match; a
    /// key present on both sides with differing values fails immediately.
    /// Metadata that cannot be read as an object matches vacuously; the
    /// core favors availability over strict filtering.
    pub fn matches(&self, manifest: &Value) -> bool {
        if self.0.is_empty() {
            return true;
        }
        let metadata = match manifest.get("metadata") {
            None | Some(Value::Null) => return true,
            Some(Value::Object(map)) => map,
            Some(other) => {
                warn!(
                    metadata_type = %json_type_name(other),
                    "manifest metadata is not an object; treating as filter match"
                );
                return true;
            }
        };

        let lowered: BTreeMap<String, &Value> = metadata
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();

        for (key, expected) in &self.0 {
            let Some(actual) = lowered.get(key) else {
                continue;
            };
            let matches = match actual {
                Value::String(s) => s == expected,
                Value::Bool(b) => b.to_string() == *expected,
                Value::Number(n) => n.to_string() == *expected,
                other => {
                    warn!(
                        key,
                        value_type = %json_type_name(other),
                        "unreadable manifest metadata value; treating as filter match"
                    );
                    continue;
                }
            };
            if !matches {
                return false;
            }
        }
        true
    }

    /// Check a serialized manifest body against this filter set.
    ///
    /// A body that fails to parse matches vacuously, logged as a warning.
    pub fn matches_raw(&self, manifest_json: &str) -> bool {
        if self.0.is_empty() {
            return true;
        }
        match serde_json::from_str::<Value>(manifest_json) {
            Ok(manifest) => self.matches(&manifest),
            Err(e) => {
                warn!(error = %e, "stored manifest failed to parse; treating as filter match");
                true
            }
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_filters_match_everything() {
        let filters = ManifestFilters::empty();
        assert!(filters.matches(&json!({"metadata": {"branch-name": "main"}})));
        assert!(filters.matches(&json!({})));
    }

    #[test]
    fn test_parse_header_quoted_pairs() {
        let filters =
            ManifestFilters::parse_header(Some(r#"branch-name="rollout-1",test="value""#));
        assert_eq!(filters.get("branch-name"), Some("rollout-1"));
        assert_eq!(filters.get("test"), Some("value"));
    }

    #[test]
    fn test_parse_header_absent_or_empty() {
        assert!(ManifestFilters::parse_header(None).is_empty());
        assert!(ManifestFilters::parse_header(Some("")).is_empty());
        assert!(ManifestFilters::parse_header(Some("  ")).is_empty());
    }

    #[test]
    fn test_parse_header_lowercases_keys_and_skips_garbage() {
        let filters = ManifestFilters::parse_header(Some(r#"Branch-Name="main",nonsense"#));
        assert_eq!(filters.get("branch-name"), Some("main"));
        assert_eq!(filters.get("nonsense"), None);
    }

    #[test]
    fn test_mismatched_value_fails() {
        let filters = ManifestFilters::from_pairs([("branch-name", "rollout-1")]);
        assert!(!filters.matches(&json!({"metadata": {"branch-name": "main"}})));
    }

    #[test]
    fn test_metadata_key_case_insensitive() {
        let filters = ManifestFilters::from_pairs([("branch-name", "main")]);
        assert!(filters.matches(&json!({"metadata": {"Branch-Name": "main"}})));
    }

    #[test]
    fn test_filter_key_absent_from_metadata_is_ignored() {
        let filters = ManifestFilters::from_pairs([("audience", "beta")]);
        assert!(filters.matches(&json!({"metadata": {"branch-name": "main"}})));
    }

    #[test]
    fn test_unreadable_metadata_fails_open() {
        let filters = ManifestFilters::from_pairs([("branch-name", "main")]);
        assert!(filters.matches(&json!({"metadata": "not-an-object"})));
        assert!(filters.matches_raw("{ this is not json"));
    }

    #[test]
    fn test_non_string_metadata_values_compare_by_display() {
        let filters = ManifestFilters::from_pairs([("rollout", "true")]);
        assert!(filters.matches(&json!({"metadata": {"rollout": true}})));
        let filters = ManifestFilters::from_pairs([("rollout", "false")]);
        assert!(!filters.matches(&json!({"metadata": {"rollout": true}})));
    }
}
