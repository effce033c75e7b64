use std::sync::Arc;

pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod refresher;
pub mod repository;
pub mod server;

pub use cache::{CacheBackend, CachedEntry, EntityCache};
pub use config::{AppConfig, CacheConfig, RedisConfig, ServerConfig, StorageBackend};
pub use observability::{init_tracing, init_tracing_from_config};
pub use refresher::CacheRefresher;
pub use server::{AppState, ServerBuilder, StockroomServer, build_app, create_document_store};

/// Create a cache backend based on configuration.
///
/// With Redis disabled this is the local DashMap tier alone. With Redis
/// enabled a pool is created and one connection is checked out; if either
/// step fails the server logs a warning and keeps running on the local tier.
pub async fn create_cache_backend(config: &RedisConfig) -> CacheBackend {
    if !config.enabled {
        tracing::info!("Redis disabled, using local cache only");
        return CacheBackend::new_local();
    }

    tracing::info!(url = %config.url, "Connecting to Redis");

    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    let mut pool_config = deadpool_redis::PoolConfig::new(config.pool_size);
    pool_config.timeouts.wait = Some(config.timeout());
    pool_config.timeouts.create = Some(config.timeout());
    pool_config.timeouts.recycle = Some(config.timeout());
    redis_config.pool = Some(pool_config);

    let pool = match redis_config.create_pool(Some(deadpool_redis::Runtime::Tokio1)) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to create Redis pool. Falling back to local cache."
            );
            return CacheBackend::new_local();
        }
    };

    match pool.get().await {
        Ok(_) => {
            tracing::info!("Connected to Redis");
            let backend = CacheBackend::new_redis(pool, config.l1_ttl());

            if let CacheBackend::Redis { local, epoch, .. } = &backend {
                cache::CacheInvalidationListener {
                    redis_url: config.url.clone(),
                    local_cache: Arc::clone(local),
                    epoch: Arc::clone(epoch),
                }
                .start();
            }

            backend
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to connect to Redis. Falling back to local cache."
            );
            CacheBackend::new_local()
        }
    }
}
