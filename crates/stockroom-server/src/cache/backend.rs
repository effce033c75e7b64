//! Cache backend implementation with L1 (DashMap) and L2 (Redis) tiers.

use async_trait::async_trait;
use dashmap::DashMap;
use deadpool_redis::Pool;
use redis::AsyncCommands;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use super::pubsub::{INVALIDATION_CHANNEL, apply_invalidation, prefix_pattern};
use super::store::{CacheError, CacheStore};

/// Keys per `SCAN` round trip during prefix deletes.
const SCAN_BATCH: usize = 100;

/// A cached entry with TTL support.
///
/// The data is wrapped in `Arc` so hits clone a pointer, not the payload.
#[derive(Clone, Debug)]
pub struct CachedEntry {
    pub data: Arc<Vec<u8>>,
    pub cached_at: Instant,
    pub ttl: Duration,
}

impl CachedEntry {
    pub fn new(data: Vec<u8>, ttl: Duration) -> Self {
        Self {
            data: Arc::new(data),
            cached_at: Instant::now(),
            ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.cached_at.elapsed() >= self.ttl
    }
}

/// Two-tier cache backend.
///
/// ## Cache Modes
///
/// - **Local**: single instance, DashMap only
/// - **Redis**: shared Redis (L2) with a per-process DashMap (L1) in front.
///   L1 entries never outlive the Redis entry they were read from and are
///   capped at `l1_ttl`; peers drop theirs through `cache:invalidate`.
///
/// Invalidations delete from Redis before touching L1, and every L1
/// invalidation bumps `epoch`. A read that overlapped one does not promote
/// what it fetched from L2.
#[derive(Clone)]
pub enum CacheBackend {
    Local(Arc<DashMap<String, CachedEntry>>),

    Redis {
        redis: Pool,
        local: Arc<DashMap<String, CachedEntry>>,
        epoch: Arc<AtomicU64>,
        l1_ttl: Duration,
    },
}

impl CacheBackend {
    pub fn new_local() -> Self {
        CacheBackend::Local(Arc::new(DashMap::new()))
    }

    pub fn new_redis(redis_pool: Pool, l1_ttl: Duration) -> Self {
        CacheBackend::Redis {
            redis: redis_pool,
            local: Arc::new(DashMap::new()),
            epoch: Arc::new(AtomicU64::new(0)),
            l1_ttl,
        }
    }

    /// The in-process tier (the whole cache in local mode).
    pub fn local_cache(&self) -> &Arc<DashMap<String, CachedEntry>> {
        match self {
            CacheBackend::Local(map) => map,
            CacheBackend::Redis { local, .. } => local,
        }
    }

    pub fn l1_entries(&self) -> usize {
        self.local_cache().len()
    }
}

fn local_get(map: &DashMap<String, CachedEntry>, key: &str) -> Option<Arc<Vec<u8>>> {
    if let Some(entry) = map.get(key) {
        if !entry.is_expired() {
            return Some(Arc::clone(&entry.data));
        }
    }
    map.remove_if(key, |_, entry| entry.is_expired());
    None
}

/// Inserts an entry read from L2 unless L1 was invalidated after `observed`.
///
/// The epoch is checked while the shard lock for `key` is held, so an
/// invalidation either lands before the check or removes the entry after it.
fn promote(
    local: &DashMap<String, CachedEntry>,
    epoch: &AtomicU64,
    observed: u64,
    key: &str,
    entry: CachedEntry,
) -> bool {
    let slot = local.entry(key.to_string());
    if epoch.load(Ordering::SeqCst) != observed {
        return false;
    }
    slot.insert(entry);
    true
}

fn local_remove_prefix(map: &DashMap<String, CachedEntry>, prefix: &str) -> u64 {
    let before = map.len();
    map.retain(|key, _| !key.starts_with(prefix));
    before.saturating_sub(map.len()) as u64
}

#[async_trait]
impl CacheStore for CacheBackend {
    async fn get(&self, key: &str) -> Result<Option<Arc<Vec<u8>>>, CacheError> {
        match self {
            CacheBackend::Local(map) => Ok(local_get(map, key)),
            CacheBackend::Redis {
                redis,
                local,
                epoch,
                l1_ttl,
            } => {
                if let Some(data) = local_get(local, key) {
                    tracing::debug!(key = %key, "cache hit (L1)");
                    return Ok(Some(data));
                }

                let observed = epoch.load(Ordering::SeqCst);
                let mut conn = redis.get().await?;
                let (data, pttl): (Option<Vec<u8>>, i64) = redis::pipe()
                    .get(key)
                    .pttl(key)
                    .query_async(&mut conn)
                    .await?;

                let Some(data) = data else {
                    tracing::debug!(key = %key, "cache miss");
                    return Ok(None);
                };

                // PTTL is -1 for keys without expiry and -2 when the key vanished
                // between the two commands; neither is promoted.
                if pttl > 0 {
                    let ttl = Duration::from_millis(pttl as u64).min(*l1_ttl);
                    let entry = CachedEntry::new(data, ttl);
                    let shared = Arc::clone(&entry.data);
                    if promote(local, epoch, observed, key, entry) {
                        tracing::debug!(key = %key, "cache hit (L2)");
                    } else {
                        tracing::debug!(key = %key, "cache hit (L2, invalidated during read)");
                    }
                    Ok(Some(shared))
                } else {
                    tracing::debug!(key = %key, "cache hit (L2, not promoted)");
                    Ok(Some(Arc::new(data)))
                }
            }
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        match self {
            CacheBackend::Local(map) => {
                map.insert(key.to_string(), CachedEntry::new(value, ttl));
                Ok(())
            }
            CacheBackend::Redis {
                redis,
                local,
                l1_ttl,
                ..
            } => {
                let ttl_secs = ttl.as_secs().max(1);
                let mut conn = redis.get().await?;
                conn.set_ex::<_, _, ()>(key, value.as_slice(), ttl_secs)
                    .await?;
                local.insert(key.to_string(), CachedEntry::new(value, ttl.min(*l1_ttl)));
                tracing::debug!(key = %key, ttl_secs, "cache set (L1+L2)");
                Ok(())
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        match self {
            CacheBackend::Local(map) => {
                map.remove(key);
                tracing::debug!(key = %key, "cache invalidated (local)");
                Ok(())
            }
            CacheBackend::Redis {
                redis,
                local,
                epoch,
                ..
            } => {
                let mut conn = redis.get().await?;
                conn.del::<_, ()>(key).await?;
                apply_invalidation(local, epoch, key);
                conn.publish::<_, _, ()>(INVALIDATION_CHANNEL, key).await?;
                tracing::debug!(key = %key, "cache invalidated (L1+L2+pub/sub)");
                Ok(())
            }
        }
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        match self {
            CacheBackend::Local(map) => Ok(local_remove_prefix(map, prefix)),
            CacheBackend::Redis {
                redis,
                local,
                epoch,
                ..
            } => {
                let pattern = prefix_pattern(prefix);
                let mut conn = redis.get().await?;
                let mut cursor: u64 = 0;
                let mut removed: u64 = 0;
                loop {
                    let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(&pattern)
                        .arg("COUNT")
                        .arg(SCAN_BATCH)
                        .query_async(&mut conn)
                        .await?;
                    if !keys.is_empty() {
                        let deleted: u64 = conn.del(&keys).await?;
                        removed += deleted;
                    }
                    if next == 0 {
                        break;
                    }
                    cursor = next;
                }

                let announce = format!("{prefix}*");
                apply_invalidation(local, epoch, &announce);
                conn.publish::<_, _, ()>(INVALIDATION_CHANNEL, &announce)
                    .await?;
                tracing::debug!(prefix = %prefix, removed, "cache prefix invalidated (L1+L2+pub/sub)");
                Ok(removed)
            }
        }
    }

    fn mode(&self) -> &'static str {
        match self {
            CacheBackend::Local(_) => "local",
            CacheBackend::Redis { .. } => "redis",
        }
    }

    fn purge_expired(&self) -> usize {
        let map = self.local_cache();
        let before = map.len();
        map.retain(|_, entry| !entry.is_expired());
        before.saturating_sub(map.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_get_set_delete() {
        let cache = CacheBackend::new_local();
        cache
            .set("product:1", b"pen".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(
            cache.get("product:1").await.unwrap(),
            Some(Arc::new(b"pen".to_vec()))
        );

        cache.delete("product:1").await.unwrap();
        assert!(cache.get("product:1").await.unwrap().is_none());
        assert_eq!(cache.mode(), "local");
    }

    #[tokio::test]
    async fn local_entries_expire() {
        let cache = CacheBackend::new_local();
        cache
            .set("k", b"v".to_vec(), Duration::from_millis(50))
            .await
            .unwrap();
        assert!(cache.get("k").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(cache.get("k").await.unwrap().is_none());
        assert_eq!(cache.l1_entries(), 0);
    }

    #[tokio::test]
    async fn prefix_delete_only_touches_matching_keys() {
        let cache = CacheBackend::new_local();
        let ttl = Duration::from_secs(60);
        for key in ["products:p1", "products:all", "product:1", "users:p1"] {
            cache.set(key, b"x".to_vec(), ttl).await.unwrap();
        }

        let removed = cache.delete_by_prefix("products:").await.unwrap();
        assert_eq!(removed, 2);
        assert!(cache.get("product:1").await.unwrap().is_some());
        assert!(cache.get("users:p1").await.unwrap().is_some());
        assert!(cache.get("products:all").await.unwrap().is_none());
    }

    #[test]
    fn promotion_is_skipped_after_an_invalidation() {
        let local = DashMap::new();
        let epoch = AtomicU64::new(0);
        let entry = || CachedEntry::new(b"old".to_vec(), Duration::from_secs(60));

        let observed = epoch.load(Ordering::SeqCst);
        apply_invalidation(&local, &epoch, "product:1");
        assert!(!promote(&local, &epoch, observed, "product:1", entry()));
        assert!(local.is_empty());

        let observed = epoch.load(Ordering::SeqCst);
        assert!(promote(&local, &epoch, observed, "product:1", entry()));
        assert!(local.contains_key("product:1"));
    }

    #[tokio::test]
    async fn purge_drops_only_expired_entries() {
        let cache = CacheBackend::new_local();
        cache
            .set("short", b"a".to_vec(), Duration::from_millis(10))
            .await
            .unwrap();
        cache
            .set("long", b"b".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.l1_entries(), 1);
    }
}
