//! Table management for document collections.
//!
//! Each collection is stored in its own table `(id TEXT PRIMARY KEY, data JSONB)`,
//! created the first time the collection is touched.

use std::sync::Arc;

use dashmap::DashSet;
use sqlx_postgres::PgPool;
use tracing::{debug, instrument};

use crate::error::{PostgresError, Result};

/// Creates collection tables on demand and remembers which ones exist.
#[derive(Debug, Clone)]
pub struct SchemaManager {
    pool: PgPool,
    created_tables: Arc<DashSet<String>>,
}

impl SchemaManager {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            created_tables: Arc::new(DashSet::new()),
        }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Validates a collection name and returns it as a table name.
    ///
    /// Only `[a-z_][a-z0-9_]*` is accepted, since the name is spliced into SQL.
    pub fn table_name(collection: &str) -> Result<String> {
        let mut chars = collection.chars();
        let valid_start = chars
            .next()
            .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
        let valid_rest = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

        if valid_start && valid_rest && collection.len() <= 63 {
            Ok(collection.to_string())
        } else {
            Err(PostgresError::invalid_collection(collection))
        }
    }

    /// Ensures the table for `collection` exists, returning its name.
    #[instrument(skip(self))]
    pub async fn ensure_table(&self, collection: &str) -> Result<String> {
        let table = Self::table_name(collection)?;
        if self.created_tables.contains(&table) {
            return Ok(table);
        }

        let sql = format!(
            r#"CREATE TABLE IF NOT EXISTS "{table}" (
                id TEXT PRIMARY KEY,
                data JSONB NOT NULL
            )"#
        );
        sqlx_core::query::query(&sql).execute(&self.pool).await?;

        debug!(table = %table, "collection table ready");
        self.created_tables.insert(table.clone());
        Ok(table)
    }
}
