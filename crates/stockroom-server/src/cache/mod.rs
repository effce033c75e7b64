//! Side cache for entity reads.
//!
//! ```text
//! GET request → L1 (DashMap) → L2 (Redis, optional) → primary store
//! ```
//!
//! If Redis is disabled or unreachable at startup the server runs with the
//! local tier only.

pub mod backend;
pub mod entity;
pub mod keys;
pub mod pubsub;
pub mod store;

pub use backend::{CacheBackend, CachedEntry};
pub use entity::{CacheTtls, EntityCache};
pub use pubsub::{CacheInvalidationListener, INVALIDATION_CHANNEL};
pub use store::{CacheError, CacheStore, DynCacheStore};
