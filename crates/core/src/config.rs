//! Configuration types shared across crates.

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::Path;
use time::Duration;

/// Configuration consumed by the update distribution core.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdatesConfig {
    /// Remote manifest URL. None for fully embedded (offline) builds.
    #[serde(default)]
    pub update_url: Option<String>,
    /// Runtime version of the native host.
    pub runtime_version: String,
    /// Full accepted runtime-version set. Defaults to `[runtime_version]`
    /// when empty; hosts that can run several bundle generations list them
    /// all here.
    #[serde(default)]
    pub runtime_versions: Vec<String>,
    /// Scope key partitioning updates that share one local store.
    pub scope_key: String,
    /// Parse remote manifests with the legacy flat dialect before the bare
    /// one (default: false).
    #[serde(default)]
    pub uses_legacy_manifest: bool,
    /// Maximum update records retained per scope by the bounded reap
    /// policy. None disables bounded retention.
    #[serde(default)]
    pub max_retained_updates: Option<u32>,
    /// Interval between background reap runs in seconds.
    #[serde(default = "default_reap_interval_secs")]
    pub reap_interval_secs: u64,
}

fn default_reap_interval_secs() -> u64 {
    600 // 10 minutes
}

impl UpdatesConfig {
    /// Load configuration from an optional TOML file merged with
    /// `UPDATES_`-prefixed environment variables (env wins).
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed("UPDATES_").split("__"));

        let config: UpdatesConfig = figment
            .extract()
            .map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate invariants that serde defaults cannot express.
    pub fn validate(&self) -> crate::Result<()> {
        if self.runtime_version.is_empty() {
            return Err(crate::Error::Config("runtime_version is empty".into()));
        }
        if self.scope_key.is_empty() {
            return Err(crate::Error::Config("scope_key is empty".into()));
        }
        if self.max_retained_updates == Some(0) {
            return Err(crate::Error::Config(
                "max_retained_updates must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// The accepted runtime-version set, never empty.
    pub fn accepted_runtime_versions(&self) -> Vec<String> {
        if self.runtime_versions.is_empty() {
            vec![self.runtime_version.clone()]
        } else {
            self.runtime_versions.clone()
        }
    }

    /// Get the reap interval as a Duration.
    pub fn reap_interval(&self) -> Duration {
        let secs = i64::try_from(self.reap_interval_secs).unwrap_or(i64::MAX);
        Duration::seconds(secs)
    }

    /// Create a test configuration for a scope.
    ///
    /// **For testing only.**
    pub fn for_testing(scope_key: &str) -> Self {
        Self {
            update_url: Some("https://updates.example.com/manifest".to_string()),
            runtime_version: "1.0".to_string(),
            runtime_versions: Vec::new(),
            scope_key: scope_key.to_string(),
            uses_legacy_manifest: false,
            max_retained_updates: None,
            reap_interval_secs: default_reap_interval_secs(),
        }
    }
}
