//! The side-cache contract every backend implements.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Failures reported by a cache backend.
///
/// Callers outside this module never see these: [`EntityCache`] logs them
/// and degrades to a miss or a no-op.
///
/// [`EntityCache`]: super::EntityCache
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("cache payload error: {message}")]
    Payload { message: String },

    #[error("cache unavailable: {message}")]
    Unavailable { message: String },
}

impl CacheError {
    pub fn payload(message: impl Into<String>) -> Self {
        Self::Payload {
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// Key/value store with per-key expiry, used next to the primary store.
///
/// Values are opaque bytes; serialization happens in [`EntityCache`].
///
/// [`EntityCache`]: super::EntityCache
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the live value for `key`, or `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Arc<Vec<u8>>>, CacheError>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Removes every key starting with `prefix`, returning how many were removed.
    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64, CacheError>;

    /// Short backend label for logs and the health endpoint.
    fn mode(&self) -> &'static str;

    /// Drops expired entries held in process memory.
    fn purge_expired(&self) -> usize {
        0
    }
}

/// Type alias for a shareable cache store.
pub type DynCacheStore = Arc<dyn CacheStore>;
