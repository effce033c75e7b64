//! Typed, failure-tolerant view over a [`CacheStore`].

use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use std::time::Duration;

use super::store::{CacheError, CacheStore};

/// Expiry applied to each kind of cache write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    /// Single-entity entries written on a read miss.
    pub detail: Duration,
    /// Paginated listings written on a read miss.
    pub list: Duration,
    /// Everything the refresher writes.
    pub refresh: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            detail: Duration::from_secs(30 * 60),
            list: Duration::from_secs(5 * 60),
            refresh: Duration::from_secs(15 * 60),
        }
    }
}

/// MessagePack-encoding wrapper that never lets a cache failure escape.
///
/// Read errors become misses and write or invalidation errors become
/// no-ops; each is logged at `warn` with the key. A payload that no longer
/// decodes is deleted and reported as a miss.
#[derive(Clone)]
pub struct EntityCache {
    store: Arc<dyn CacheStore>,
    ttls: CacheTtls,
}

impl EntityCache {
    pub fn new(store: Arc<dyn CacheStore>, ttls: CacheTtls) -> Self {
        Self { store, ttls }
    }

    pub fn ttls(&self) -> CacheTtls {
        self.ttls
    }

    pub fn mode(&self) -> &'static str {
        self.store.mode()
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match self.store.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        match rmp_serde::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "undecodable cache entry, evicting");
                self.delete(key).await;
                None
            }
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let result = match rmp_serde::to_vec_named(value) {
            Ok(bytes) => self.store.set(key, bytes, ttl).await,
            Err(e) => Err(CacheError::payload(e.to_string())),
        };
        if let Err(e) = result {
            tracing::warn!(key = %key, error = %e, "cache write failed");
        }
    }

    pub async fn delete(&self, key: &str) {
        if let Err(e) = self.store.delete(key).await {
            tracing::warn!(key = %key, error = %e, "cache invalidation failed");
        }
    }

    pub async fn delete_by_prefix(&self, prefix: &str) {
        match self.store.delete_by_prefix(prefix).await {
            Ok(removed) => tracing::debug!(prefix = %prefix, removed, "cache prefix invalidated"),
            Err(e) => {
                tracing::warn!(key = %prefix, error = %e, "cache prefix invalidation failed")
            }
        }
    }

    /// Drops one detail entry and every listing of the same kind.
    pub async fn invalidate_entity(&self, detail_key: &str, list_prefix: &str) {
        self.delete(detail_key).await;
        self.delete_by_prefix(list_prefix).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheBackend;
    use async_trait::async_trait;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: String,
        stock: i64,
    }

    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<Arc<Vec<u8>>>, CacheError> {
            Err(CacheError::unavailable("down"))
        }
        async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::unavailable("down"))
        }
        async fn delete(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::unavailable("down"))
        }
        async fn delete_by_prefix(&self, _prefix: &str) -> Result<u64, CacheError> {
            Err(CacheError::unavailable("down"))
        }
        fn mode(&self) -> &'static str {
            "broken"
        }
    }

    fn local() -> (EntityCache, CacheBackend) {
        let backend = CacheBackend::new_local();
        (
            EntityCache::new(Arc::new(backend.clone()), CacheTtls::default()),
            backend,
        )
    }

    #[tokio::test]
    async fn stores_and_reads_typed_values() {
        let (cache, _) = local();
        let item = Item {
            id: "1".into(),
            stock: 3,
        };
        cache.set("product:1", &item, Duration::from_secs(60)).await;
        assert_eq!(cache.get::<Item>("product:1").await, Some(item));
    }

    #[tokio::test]
    async fn undecodable_entry_is_evicted() {
        let (cache, backend) = local();
        backend
            .set("product:1", vec![0xc1], Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache.get::<Item>("product:1").await, None);
        assert!(backend.get("product:1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failures_degrade_to_miss_and_noop() {
        let cache = EntityCache::new(Arc::new(BrokenStore), CacheTtls::default());
        cache
            .set(
                "k",
                &Item {
                    id: "1".into(),
                    stock: 0,
                },
                Duration::from_secs(1),
            )
            .await;
        assert_eq!(cache.get::<Item>("k").await, None);
        cache.invalidate_entity("k", "ks:").await;
    }

    #[tokio::test]
    async fn invalidate_entity_drops_detail_and_lists() {
        let (cache, backend) = local();
        let ttl = Duration::from_secs(60);
        cache.set("product:1", &1u8, ttl).await;
        cache.set("products:p1:l10", &2u8, ttl).await;
        cache.set("products:all", &3u8, ttl).await;
        cache.set("user:1", &4u8, ttl).await;

        cache.invalidate_entity("product:1", "products:").await;
        assert_eq!(backend.l1_entries(), 1);
        assert_eq!(cache.get::<u8>("user:1").await, Some(4));
    }
}
