//! PostgreSQL storage backend for Stockroom.
//!
//! Collections map to tables of `(id TEXT PRIMARY KEY, data JSONB)`. Tables
//! are created lazily the first time a collection is used, so there is no
//! migration step.
//!
//! ```ignore
//! use stockroom_db_postgres::{PostgresConfig, create_store};
//!
//! let store = create_store(&PostgresConfig::new("postgres://localhost/stockroom")).await?;
//! ```

mod config;
mod error;
mod schema;
mod sql;
mod storage;

use std::sync::Arc;

pub use config::PostgresConfig;
pub use error::{PostgresError, Result};
pub use schema::SchemaManager;
pub use sql::{SqlBuilder, SqlValue};
pub use storage::PostgresStore;

use stockroom_storage::{DynDocumentStore, StorageError};

/// Connects to PostgreSQL and returns the store behind the trait object.
pub async fn create_store(config: &PostgresConfig) -> std::result::Result<DynDocumentStore, StorageError> {
    Ok(Arc::new(PostgresStore::new(config).await?))
}
