//! Content-addressed local asset file store.

use crate::error::{AssetStoreError, AssetStoreResult};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use uuid::Uuid;

/// Local directory of asset files keyed by storage key.
///
/// Writes are atomic (temp file + rename) so a crash mid-download never
/// leaves a partially written asset that a later launch would treat as
/// materialized.
pub struct AssetFileStore {
    root: PathBuf,
}

impl AssetFileStore {
    /// Create a new asset file store rooted at the given directory.
    pub async fn new(root: impl AsRef<Path>) -> AssetStoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Resolve the local path for a storage key, rejecting keys that would
    /// escape the asset root.
    pub fn local_path(&self, key: &str) -> AssetStoreResult<PathBuf> {
        if key.is_empty() {
            return Err(AssetStoreError::InvalidKey("empty key".to_string()));
        }
        if key.contains("..") || key.starts_with('/') || key.starts_with('\\') {
            return Err(AssetStoreError::InvalidKey(format!(
                "path traversal not allowed: {key}"
            )));
        }
        for component in Path::new(key).components() {
            match component {
                std::path::Component::Normal(_) => {}
                _ => {
                    return Err(AssetStoreError::InvalidKey(format!(
                        "contains unsafe path component: {key}"
                    )));
                }
            }
        }
        Ok(self.root.join(key))
    }

    /// Check whether an asset file exists locally.
    #[instrument(skip(self))]
    pub async fn contains(&self, key: &str) -> AssetStoreResult<bool> {
        let path = self.local_path(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    /// Read an asset file.
    #[instrument(skip(self))]
    pub async fn read(&self, key: &str) -> AssetStoreResult<Bytes> {
        let path = self.local_path(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AssetStoreError::NotFound(key.to_string()))
            }
            Err(e) => Err(AssetStoreError::Io(e)),
        }
    }

    /// Write an asset file atomically, returning its final path.
    ///
    /// Writing the same key twice is safe; the second write replaces the
    /// first byte-identical content.
    #[instrument(skip(self, data), fields(len = data.len()))]
    pub async fn write(&self, key: &str, data: Bytes) -> AssetStoreResult<PathBuf> {
        let path = self.local_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Unique temp name: concurrent writers of the same key must not
        // step on each other's partial file.
        let tmp_path = path.with_extension(format!("tmp.{}", Uuid::new_v4()));
        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&tmp_path, &path).await?;
        Ok(path)
    }

    /// Remove an asset file. Removing a missing file is not an error.
    #[instrument(skip(self))]
    pub async fn remove(&self, key: &str) -> AssetStoreResult<()> {
        let path = self.local_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AssetStoreError::Io(e)),
        }
    }

    /// The asset root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_write_read_round_trip() {
        let dir = tempdir().unwrap();
        let store = AssetFileStore::new(dir.path()).await.unwrap();

        let path = store
            .write("abc123.bundle", Bytes::from_static(b"bundle"))
            .await
            .unwrap();
        assert!(path.ends_with("abc123.bundle"));
        assert!(store.contains("abc123.bundle").await.unwrap());
        assert_eq!(store.read("abc123.bundle").await.unwrap().as_ref(), b"bundle");
    }

    #[tokio::test]
    async fn test_missing_read_is_not_found() {
        let dir = tempdir().unwrap();
        let store = AssetFileStore::new(dir.path()).await.unwrap();
        assert!(matches!(
            store.read("nope").await.unwrap_err(),
            AssetStoreError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = AssetFileStore::new(dir.path()).await.unwrap();
        store
            .write("gone.bundle", Bytes::from_static(b"x"))
            .await
            .unwrap();
        store.remove("gone.bundle").await.unwrap();
        store.remove("gone.bundle").await.unwrap();
        assert!(!store.contains("gone.bundle").await.unwrap());
    }

    #[tokio::test]
    async fn test_traversal_keys_rejected() {
        let dir = tempdir().unwrap();
        let store = AssetFileStore::new(dir.path()).await.unwrap();
        assert!(matches!(
            store.local_path("../escape"),
            Err(AssetStoreError::InvalidKey(_))
        ));
        assert!(matches!(
            store.local_path("/absolute"),
            Err(AssetStoreError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_overwrite_is_safe() {
        let dir = tempdir().unwrap();
        let store = AssetFileStore::new(dir.path()).await.unwrap();
        store.write("k", Bytes::from_static(b"one")).await.unwrap();
        store.write("k", Bytes::from_static(b"two")).await.unwrap();
        assert_eq!(store.read("k").await.unwrap().as_ref(), b"two");
    }
}
