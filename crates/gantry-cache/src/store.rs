//! Cache storage backends.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;

use crate::error::CacheError;
use crate::key::CacheKey;

/// Trait for keyed blob stores backing the cache.
///
/// Concurrent access is safe without coordination: keys are derived from
/// immutable content fingerprints, so two writers racing on the same key are
/// writing the same content.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a blob. `Ok(None)` is a miss, not an error.
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheError>;

    /// Store a blob under a key, replacing any existing entry.
    async fn put(&self, key: &CacheKey, data: Bytes) -> Result<(), CacheError>;
}

/// Local-disk store: one file per key under an explicitly configured root.
///
/// The root is passed in rather than discovered from ambient state so that
/// nodes stay independently testable.
pub struct LocalDiskStore {
    root: PathBuf,
}

impl LocalDiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.as_str())
    }
}

#[async_trait]
impl CacheStore for LocalDiskStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheError> {
        match tokio::fs::read(self.entry_path(key)).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &CacheKey, data: Bytes) -> Result<(), CacheError> {
        tokio::fs::create_dir_all(&self.root).await?;
        // Write-then-rename so a torn write never becomes a visible entry
        let tmp = self.root.join(format!("{}.tmp", key.as_str()));
        tokio::fs::write(&tmp, &data).await?;
        tokio::fs::rename(&tmp, self.entry_path(key)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDiskStore::new(dir.path());
        let key = CacheKey::derive("stable/minimal/", "lockhash");

        store
            .put(&key, Bytes::from_static(b"artifact"))
            .await
            .unwrap();
        let got = store.get(&key).await.unwrap();
        assert_eq!(got.unwrap(), Bytes::from_static(b"artifact"));
    }

    #[tokio::test]
    async fn test_get_miss_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDiskStore::new(dir.path());
        let key = CacheKey::derive("stable/minimal/", "never-stored");

        assert!(store.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_existing_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDiskStore::new(dir.path());
        let key = CacheKey::derive("stable/minimal/", "lockhash");

        store.put(&key, Bytes::from_static(b"old")).await.unwrap();
        store.put(&key, Bytes::from_static(b"new")).await.unwrap();
        assert_eq!(
            store.get(&key).await.unwrap().unwrap(),
            Bytes::from_static(b"new")
        );
    }
}
