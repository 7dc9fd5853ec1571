//! Cache restore/save policy.

use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, warn};

use gantry_core::workflow::{CacheSpec, ToolchainSpec};

use crate::error::CacheError;
use crate::key::{CacheKey, fingerprint_bytes};
use crate::store::CacheStore;

/// Applies the engine's cache policy over a [`CacheStore`]:
/// restore is best-effort, save never observes an error, and key derivation
/// is the only way to address an entry.
pub struct CacheManager {
    store: Arc<dyn CacheStore>,
}

impl CacheManager {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Derive the key for a cache entry from the job's toolchain and the
    /// current contents of the cache's lockfile.
    ///
    /// Returns `None` (logged) when the lockfile cannot be read; the caller
    /// proceeds as on a miss.
    pub async fn derive_key(
        &self,
        toolchain: &ToolchainSpec,
        cache: &CacheSpec,
    ) -> Option<CacheKey> {
        match tokio::fs::read(&cache.lockfile).await {
            Ok(bytes) => Some(CacheKey::derive(
                &toolchain.fingerprint(),
                &fingerprint_bytes(&bytes),
            )),
            Err(e) => {
                let err = CacheError::Lockfile {
                    path: cache.lockfile.clone(),
                    source: e,
                };
                warn!(cache = %cache.name, error = %err, "Treating cache as absent");
                None
            }
        }
    }

    /// Best-effort restore. A miss and a backend error both return `None`;
    /// the node proceeds as if no cache existed.
    pub async fn restore(&self, key: &CacheKey) -> Option<Bytes> {
        match self.store.get(key).await {
            Ok(Some(data)) => {
                debug!(key = %key, size = data.len(), "Cache hit");
                Some(data)
            }
            Ok(None) => {
                debug!(key = %key, "Cache miss");
                None
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cache restore failed, treating as miss");
                None
            }
        }
    }

    /// Save an artifact. Callers only reach this after every command in the
    /// node succeeded; a backend error is logged and swallowed.
    pub async fn save(&self, key: &CacheKey, data: Bytes) {
        match self.store.put(key, data).await {
            Ok(()) => debug!(key = %key, "Cache saved"),
            Err(e) => warn!(key = %key, error = %e, "Cache save failed, continuing"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use async_trait::async_trait;

    struct FailingStore;

    #[async_trait]
    impl CacheStore for FailingStore {
        async fn get(&self, _key: &CacheKey) -> Result<Option<Bytes>, CacheError> {
            Err(CacheError::Io(std::io::Error::other("backend down")))
        }

        async fn put(&self, _key: &CacheKey, _data: Bytes) -> Result<(), CacheError> {
            Err(CacheError::Io(std::io::Error::other("backend down")))
        }
    }

    #[tokio::test]
    async fn test_restore_error_is_a_miss() {
        let manager = CacheManager::new(Arc::new(FailingStore));
        let key = CacheKey::derive("stable", "lock");
        assert!(manager.restore(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_save_error_is_swallowed() {
        let manager = CacheManager::new(Arc::new(FailingStore));
        let key = CacheKey::derive("stable", "lock");
        // Must not panic or propagate
        manager.save(&key, Bytes::from_static(b"data")).await;
    }

    #[tokio::test]
    async fn test_derive_key_missing_lockfile_is_none() {
        let manager = CacheManager::new(Arc::new(FailingStore));
        let toolchain = ToolchainSpec {
            name: "stable".to_string(),
            profile: "minimal".to_string(),
            components: vec![],
        };
        let cache = CacheSpec {
            name: "cargo".to_string(),
            path: "target/ci-cache.bin".to_string(),
            lockfile: "/definitely/not/here/Cargo.lock".to_string(),
        };
        assert!(manager.derive_key(&toolchain, &cache).await.is_none());
    }
}
