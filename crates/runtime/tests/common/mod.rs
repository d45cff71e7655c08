//! Shared fixtures for runtime integration tests.
#![allow(dead_code)] // not every test binary uses every fixture

use async_trait::async_trait;
use bytes::Bytes;
use hangar_assets::{AssetFileStore, RemoteError, RemoteSource};
use hangar_db::models::{AssetRow, UpdateRow};
use hangar_db::SqliteStore;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// In-memory fetch primitive standing in for the host's transport.
#[derive(Default)]
pub struct MockRemoteSource {
    responses: Mutex<HashMap<String, Bytes>>,
    fetch_count: AtomicUsize,
}

impl MockRemoteSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, url: &str, data: impl Into<Bytes>) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), data.into());
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteSource for MockRemoteSource {
    async fn fetch(&self, url: &str) -> Result<Bytes, RemoteError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| RemoteError::FetchFailed {
                url: url.to_string(),
                reason: "no response configured".to_string(),
            })
    }
}

pub async fn in_memory_store() -> Arc<SqliteStore> {
    Arc::new(
        SqliteStore::in_memory()
            .await
            .expect("failed to open in-memory store"),
    )
}

pub async fn asset_dir(dir: &std::path::Path) -> Arc<AssetFileStore> {
    Arc::new(
        AssetFileStore::new(dir)
            .await
            .expect("failed to create asset dir"),
    )
}

pub fn update_row(
    scope_key: &str,
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
        runtime_version: "1.0".to_string(),
        scope_key: scope_key.to_string(),
        manifest_json,
        last_accessed: OffsetDateTime::UNIX_EPOCH + Duration::seconds(commit_offset_secs),
    }
}

pub fn asset_row(asset_key: &str, is_launch_asset: bool, url: Option<&str>) -> AssetRow {
    AssetRow {
        asset_key: asset_key.to_string(),
        relative_path: format!("{asset_key}.bundle"),
        content_type: Some("application/javascript".to_string()),
        is_launch_asset,
        url: url.map(str::to_string),
        created_at: OffsetDateTime::UNIX_EPOCH,
    }
}

/// A modern-format manifest body for loader/controller tests.
pub fn modern_manifest(id: Uuid, created_at: &str, url: &str, key: &str, branch: &str) -> Value {
    json!({
        "id": id.to_string(),
        "createdAt": created_at,
        "runtimeVersion": "1.0",
        "launchAsset": {
            "url": url,
            "key": key,
            "contentType": "application/javascript"
        },
        "metadata": {"branch-name": branch}
    })
}
