//! Redis Pub/Sub for cross-instance L1 invalidation.
//!
//! ```text
//! Instance 1: cache.delete("product:42")
//!   ↓
//! Redis Pub/Sub: PUBLISH cache:invalidate "product:42"
//!   ↓
//! Instance 2: listener receives "product:42" → removes it from L1
//! ```
//!
//! Prefix deletes publish `"<prefix>*"`; receivers drop every L1 key with
//! that prefix. Stored keys never end in `*`.

use dashmap::DashMap;
use futures_util::StreamExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;

use super::backend::CachedEntry;

/// Channel carrying invalidated keys and prefixes.
pub const INVALIDATION_CHANNEL: &str = "cache:invalidate";

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Builds a `SCAN MATCH` pattern selecting every key that starts with `prefix`.
pub fn prefix_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for ch in prefix.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('*');
    pattern
}

/// Applies one invalidation payload to the local tier and bumps `epoch`
/// so reads already in flight do not promote what they fetched.
pub fn apply_invalidation(
    local: &DashMap<String, CachedEntry>,
    epoch: &AtomicU64,
    payload: &str,
) {
    epoch.fetch_add(1, Ordering::SeqCst);
    match payload.strip_suffix('*') {
        Some(prefix) => local.retain(|key, _| !key.starts_with(prefix)),
        None => {
            local.remove(payload);
        }
    }
}

/// Subscribes to [`INVALIDATION_CHANNEL`] and applies what peers publish.
pub struct CacheInvalidationListener {
    pub redis_url: String,
    pub local_cache: Arc<DashMap<String, CachedEntry>>,
    pub epoch: Arc<AtomicU64>,
}

impl CacheInvalidationListener {
    /// Spawns the listener. It reconnects with exponential backoff
    /// (1s doubling up to 30s) whenever the subscription drops.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut backoff = INITIAL_BACKOFF;
            loop {
                if let Err(e) = self.run(&mut backoff).await {
                    tracing::error!(
                        error = %e,
                        backoff_secs = backoff.as_secs(),
                        "Cache invalidation listener error, reconnecting..."
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        })
    }

    async fn run(&self, backoff: &mut Duration) -> Result<(), String> {
        let client = redis::Client::open(self.redis_url.as_str())
            .map_err(|e| format!("failed to create Redis client: {e}"))?;

        let mut pubsub = client
            .get_async_pubsub()
            .await
            .map_err(|e| format!("failed to get pub/sub connection: {e}"))?;

        pubsub
            .subscribe(INVALIDATION_CHANNEL)
            .await
            .map_err(|e| format!("failed to subscribe: {e}"))?;

        tracing::info!(channel = INVALIDATION_CHANNEL, "Subscribed to cache invalidation channel");
        *backoff = INITIAL_BACKOFF;

        let mut stream = pubsub.on_message();
        while let Some(msg) = stream.next().await {
            match msg.get_payload::<String>() {
                Ok(payload) => {
                    tracing::debug!(key = %payload, "received cache invalidation");
                    apply_invalidation(&self.local_cache, &self.epoch, &payload);
                }
                Err(e) => tracing::warn!(error = %e, "failed to parse invalidation payload"),
            }
        }
        Err("pub/sub connection closed".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> CachedEntry {
        CachedEntry::new(b"x".to_vec(), Duration::from_secs(60))
    }

    #[test]
    fn pattern_escapes_glob_characters() {
        assert_eq!(prefix_pattern("products:"), "products:*");
        assert_eq!(prefix_pattern("a*b?[c]"), "a\\*b\\?\\[c\\]*");
    }

    #[test]
    fn payloads_remove_keys_or_prefixes() {
        let local = DashMap::new();
        let epoch = AtomicU64::new(0);
        for key in ["product:1", "products:p1", "products:all", "users:all"] {
            local.insert(key.to_string(), entry());
        }

        apply_invalidation(&local, &epoch, "product:1");
        assert!(!local.contains_key("product:1"));
        assert_eq!(local.len(), 3);

        apply_invalidation(&local, &epoch, "products:*");
        assert_eq!(local.len(), 1);
        assert_eq!(epoch.load(Ordering::SeqCst), 2);
        assert!(local.contains_key("users:all"));
    }
}
