//! Integration tests for the reaper.

mod common;

use bytes::Bytes;
use common::{asset_dir, asset_row, in_memory_store, update_row};
use hangar_core::ManifestFilters;
use hangar_db::{AssetRepo, UpdateRepo};
use hangar_runtime::{Reaper, SelectionPolicy};
use std::sync::Arc;

#[tokio::test]
async fn test_shared_asset_file_survives_until_last_reference() {
    let store = in_memory_store().await;
    let dir = tempfile::tempdir().unwrap();
    let files = asset_dir(dir.path()).await;
    let policy = Arc::new(SelectionPolicy::filter_aware(vec!["1.0".to_string()]));
    let reaper = Reaper::new(store.clone(), files.clone(), policy);

    // Updates A and B share the content-addressed asset h1.
    let update_a = update_row("app", 0, None);
    let update_b = update_row("app", 60, None);
    let shared = asset_row("h1", true, Some("https://cdn.example.com/h1"));
    store.insert_update(&update_a, &[shared.clone()]).await.unwrap();
    store.insert_update(&update_b, &[shared.clone()]).await.unwrap();
    files
        .write(&shared.relative_path, Bytes::from_static(b"shared"))
        .await
        .unwrap();

    // Deleting A leaves h1 referenced by B: reap must not touch the file.
    store.delete_updates(&[update_a.update_id]).await.unwrap();
    let stats = reaper.reap("app", None, &ManifestFilters::empty()).await;
    assert_eq!(stats.assets_deleted, 0);
    assert_eq!(stats.errors, 0);
    assert!(files.contains(&shared.relative_path).await.unwrap());

    // Deleting B orphans h1: the next reap removes record and file.
    store.delete_updates(&[update_b.update_id]).await.unwrap();
    let stats = reaper.reap("app", None, &ManifestFilters::empty()).await;
    assert_eq!(stats.assets_deleted, 1);
    assert_eq!(stats.files_removed, 1);
    assert!(!files.contains(&shared.relative_path).await.unwrap());
    assert!(store.get_asset("h1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_filter_aware_reap_keeps_safety_update() {
    let store = in_memory_store().await;
    let dir = tempfile::tempdir().unwrap();
    let files = asset_dir(dir.path()).await;
    let policy = Arc::new(SelectionPolicy::filter_aware(vec!["1.0".to_string()]));
    let reaper = Reaper::new(store.clone(), files.clone(), policy);

    let d1 = update_row("app", 0, Some(("branch-name", "beta")));
    let r1 = update_row("app", 60, Some(("branch-name", "main")));
    let d2 = update_row("app", 120, Some(("branch-name", "beta")));
    let launched = update_row("app", 180, Some(("branch-name", "main")));

    for (update, key) in [(&d1, "d1"), (&r1, "r1"), (&d2, "d2"), (&launched, "r2")] {
        let asset = asset_row(key, true, Some("https://cdn.example.com/a"));
        store.insert_update(update, &[asset.clone()]).await.unwrap();
        files
            .write(&asset.relative_path, Bytes::from_static(b"data"))
            .await
            .unwrap();
    }

    let filters = ManifestFilters::from_pairs([("branch-name", "main")]);
    let stats = reaper.reap("app", Some(&launched), &filters).await;

    assert_eq!(stats.updates_deleted, 2);
    assert_eq!(stats.assets_deleted, 2);
    assert_eq!(stats.errors, 0);

    // D1 and D2 are gone with their files; the safety update R1 and the
    // launched update survive untouched.
    assert!(store.get_update(d1.update_id).await.unwrap().is_none());
    assert!(store.get_update(d2.update_id).await.unwrap().is_none());
    assert!(store.get_update(r1.update_id).await.unwrap().is_some());
    assert!(store.get_update(launched.update_id).await.unwrap().is_some());
    assert!(!files.contains("d1.bundle").await.unwrap());
    assert!(files.contains("r1.bundle").await.unwrap());
    assert!(files.contains("r2.bundle").await.unwrap());
}

#[tokio::test]
async fn test_bounded_retention_reap_evicts_lru() {
    let store = in_memory_store().await;
    let dir = tempfile::tempdir().unwrap();
    let files = asset_dir(dir.path()).await;
    let policy = Arc::new(SelectionPolicy::bounded(vec!["1.0".to_string()], 2));
    let reaper = Reaper::new(store.clone(), files.clone(), policy);

    // last_accessed follows the commit offsets in update_row, so the two
    // oldest are the LRU candidates; one of them is the launched update.
    let stale = update_row("app", 0, None);
    let launched = update_row("app", 30, None);
    let mid = update_row("app", 60, None);
    let fresh = update_row("app", 90, None);

    for (update, key) in [
        (&stale, "stale"),
        (&launched, "launched"),
        (&mid, "mid"),
        (&fresh, "fresh"),
    ] {
        store
            .insert_update(update, &[asset_row(key, true, Some("https://c.example/a"))])
            .await
            .unwrap();
    }

    let stats = reaper
        .reap("app", Some(&launched), &ManifestFilters::empty())
        .await;

    // Two evictions bring the count to the limit; the launched update is
    // skipped even though it is among the least recently used.
    assert_eq!(stats.updates_deleted, 2);
    assert!(store.get_update(stale.update_id).await.unwrap().is_none());
    assert!(store.get_update(mid.update_id).await.unwrap().is_none());
    assert!(store.get_update(launched.update_id).await.unwrap().is_some());
    assert!(store.get_update(fresh.update_id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_reap_other_scope_untouched() {
    let store = in_memory_store().await;
    let dir = tempfile::tempdir().unwrap();
    let files = asset_dir(dir.path()).await;
    let policy = Arc::new(SelectionPolicy::filter_aware(vec!["1.0".to_string()]));
    let reaper = Reaper::new(store.clone(), files.clone(), policy);

    let other = update_row("other", 0, None);
    store
        .insert_update(&other, &[asset_row("o1", true, None)])
        .await
        .unwrap();

    let stale = update_row("app", 0, None);
    let safety = update_row("app", 30, None);
    let launched = update_row("app", 60, None);
    for (update, key) in [(&stale, "a1"), (&safety, "a2"), (&launched, "a3")] {
        store
            .insert_update(update, &[asset_row(key, true, None)])
            .await
            .unwrap();
    }

    let stats = reaper
        .reap("app", Some(&launched), &ManifestFilters::empty())
        .await;
    assert_eq!(stats.updates_deleted, 1);
    assert!(store.get_update(other.update_id).await.unwrap().is_some());
    assert!(store.get_asset("o1").await.unwrap().is_some());
}

#[tokio::test]
async fn test_reap_on_empty_scope_is_noop() {
    let store = in_memory_store().await;
    let dir = tempfile::tempdir().unwrap();
    let files = asset_dir(dir.path()).await;
    let policy = Arc::new(SelectionPolicy::filter_aware(vec!["1.0".to_string()]));
    let reaper = Reaper::new(store.clone(), files, policy);

    let stats = reaper.reap("app", None, &ManifestFilters::empty()).await;
    assert_eq!(stats.updates_deleted, 0);
    assert_eq!(stats.assets_deleted, 0);
    assert_eq!(stats.errors, 0);
}
