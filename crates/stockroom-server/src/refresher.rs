//! Periodic cache warm-up.
//!
//! Every tick reloads both collections in full and rewrites the `*:all`
//! listing plus each detail key with the refresh TTL. Ticks do not
//! coordinate with request-driven invalidation: a tick that read the store
//! just before an update commits can re-cache the old value after the
//! update's invalidation. The refresh TTL bounds how long that lasts.

use std::time::Duration;

use stockroom_storage::DynDocumentStore;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::cache::{EntityCache, keys};
use crate::models::{ListPage, UserSummary};
use crate::repository::{ProductRepository, UserRepository};

/// Entities written by one tick; `None` when that collection failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub products: Option<usize>,
    pub users: Option<usize>,
}

#[derive(Clone)]
pub struct CacheRefresher {
    products: ProductRepository,
    users: UserRepository,
    cache: EntityCache,
}

impl CacheRefresher {
    pub fn new(store: DynDocumentStore, cache: EntityCache) -> Self {
        Self {
            products: ProductRepository::new(store.clone(), cache.clone()),
            users: UserRepository::new(store, cache.clone()),
            cache,
        }
    }

    /// Runs [`refresh_once`](Self::refresh_once) every `period`, first after
    /// one full period, until `shutdown` flips to `true` or its sender is
    /// dropped.
    pub fn spawn(self, period: Duration, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(interval_secs = period.as_secs(), "cache refresher started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.refresh_once().await;
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::info!("cache refresher stopped");
        })
    }

    pub async fn refresh_once(&self) -> RefreshSummary {
        let summary = RefreshSummary {
            products: self.refresh_products().await,
            users: self.refresh_users().await,
        };
        let purged = self.cache.store().purge_expired();
        tracing::info!(
            products = ?summary.products,
            users = ?summary.users,
            purged,
            "cache refresh completed"
        );
        summary
    }

    async fn refresh_products(&self) -> Option<usize> {
        let products = match self.products.load_all().await {
            Ok(products) => products,
            Err(e) => {
                tracing::warn!(error = %e, "cache refresh: loading products failed");
                return None;
            }
        };

        let ttl = self.cache.ttls().refresh;
        let page = ListPage {
            total: products.len() as u64,
            items: products,
        };
        self.cache.set(keys::PRODUCTS_ALL_KEY, &page, ttl).await;
        for product in &page.items {
            self.cache
                .set(&keys::product_key(&product.id), product, ttl)
                .await;
        }
        Some(page.items.len())
    }

    async fn refresh_users(&self) -> Option<usize> {
        let users = match self.users.load_all().await {
            Ok(users) => users,
            Err(e) => {
                tracing::warn!(error = %e, "cache refresh: loading users failed");
                return None;
            }
        };

        let ttl = self.cache.ttls().refresh;
        let page = ListPage {
            total: users.len() as u64,
            items: users.iter().map(|u| u.summary()).collect::<Vec<UserSummary>>(),
        };
        self.cache.set(keys::USERS_ALL_KEY, &page, ttl).await;
        for user in &users {
            self.cache
                .set(&keys::user_key(&user.id), &user.details(), ttl)
                .await;
        }
        Some(users.len())
    }
}
