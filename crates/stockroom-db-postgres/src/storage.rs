//! PostgreSQL implementation of [`DocumentStore`].

use async_trait::async_trait;
use serde_json::Value;
use sqlx_postgres::PgPool;
use stockroom_storage::{
    DeleteOutcome, Document, DocumentStore, Filter, FindOptions, ID_FIELD, StorageError,
    UpdateOutcome, document_id,
};
use tracing::{debug, instrument};

use crate::config::PostgresConfig;
use crate::error::{PG_UNIQUE_VIOLATION, PostgresError, has_pg_error_code};
use crate::schema::SchemaManager;
use crate::sql::{SqlBuilder, SqlValue, bind_query, bind_scalar};

/// Document store keeping each collection in a JSONB table.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    schema: SchemaManager,
}

impl PostgresStore {
    /// Connects to the database described by `config`.
    pub async fn new(config: &PostgresConfig) -> Result<Self, StorageError> {
        let pool = config.connect().await?;
        Ok(Self::from_pool(pool))
    }

    /// Wraps an existing pool.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            schema: SchemaManager::new(pool),
        }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        self.schema.pool()
    }

    async fn table(&self, collection: &str) -> Result<String, StorageError> {
        Ok(self.schema.ensure_table(collection).await?)
    }
}

fn into_document(value: Value) -> Result<Document, StorageError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StorageError::internal(format!(
            "stored row is not a JSON object: {other}"
        ))),
    }
}

#[async_trait]
impl DocumentStore for PostgresStore {
    #[instrument(skip(self, document))]
    async fn insert(&self, collection: &str, document: Document) -> Result<(), StorageError> {
        let id = document_id(&document)
            .ok_or_else(|| StorageError::invalid_document("document has no string id"))?
            .to_string();
        let table = self.table(collection).await?;

        let sql = format!(
            r#"INSERT INTO "{table}" (id, data) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING"#
        );
        let result = sqlx_core::query::query(&sql)
            .bind(&id)
            .bind(Value::Object(document))
            .execute(self.pool())
            .await
            .map_err(|e| {
                if has_pg_error_code(&e, PG_UNIQUE_VIOLATION) {
                    StorageError::already_exists(collection, id.clone())
                } else {
                    PostgresError::from(e).into()
                }
            })?;

        if result.rows_affected() == 0 {
            return Err(StorageError::already_exists(collection, id));
        }
        debug!(table = %table, id = %id, "document inserted");
        Ok(())
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, StorageError> {
        let table = self.table(collection).await?;
        let sql = format!(r#"SELECT data FROM "{table}" WHERE id = $1"#);

        let row: Option<Value> = sqlx_core::query_scalar::query_scalar(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(PostgresError::from)?;

        row.map(into_document).transpose()
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StorageError> {
        let table = self.table(collection).await?;
        let mut builder = SqlBuilder::new(format!(r#"SELECT data FROM "{table}""#));
        builder.push_where(filter);
        builder.push_sql(" ORDER BY id ASC LIMIT 1");

        let query = sqlx_core::query_scalar::query_scalar::<_, Value>(&builder.sql);
        let row = bind_scalar(query, &builder.params)
            .fetch_optional(self.pool())
            .await
            .map_err(PostgresError::from)?;

        row.map(into_document).transpose()
    }

    #[instrument(skip(self, filter, options))]
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StorageError> {
        let table = self.table(collection).await?;
        let mut builder = SqlBuilder::new(format!(r#"SELECT data FROM "{table}""#));
        builder.push_where(filter);
        builder.push_options(options);

        let query = sqlx_core::query_scalar::query_scalar::<_, Value>(&builder.sql);
        let rows = bind_scalar(query, &builder.params)
            .fetch_all(self.pool())
            .await
            .map_err(PostgresError::from)?;

        rows.into_iter().map(into_document).collect()
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StorageError> {
        let table = self.table(collection).await?;
        let mut builder = SqlBuilder::new(format!(r#"SELECT COUNT(*) FROM "{table}""#));
        builder.push_where(filter);

        let query = sqlx_core::query_scalar::query_scalar::<_, i64>(&builder.sql);
        let total = bind_scalar(query, &builder.params)
            .fetch_one(self.pool())
            .await
            .map_err(PostgresError::from)?;

        Ok(u64::try_from(total).unwrap_or_default())
    }

    async fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        mut changes: Document,
    ) -> Result<UpdateOutcome, StorageError> {
        let table = self.table(collection).await?;
        changes.remove(ID_FIELD);

        let mut builder = SqlBuilder::new(format!(r#"UPDATE "{table}" SET data = data || "#));
        let patch = builder.push_param(SqlValue::Json(Value::Object(changes)));
        let key = builder.push_param(SqlValue::Text(id.to_string()));
        builder.push_sql(&format!("{patch} WHERE id = {key}"));

        let query = sqlx_core::query::query(&builder.sql);
        let result = bind_query(query, &builder.params)
            .execute(self.pool())
            .await
            .map_err(PostgresError::from)?;

        Ok(UpdateOutcome {
            matched: result.rows_affected(),
        })
    }

    async fn delete_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<DeleteOutcome, StorageError> {
        let table = self.table(collection).await?;
        let sql = format!(r#"DELETE FROM "{table}" WHERE id = $1"#);

        let result = sqlx_core::query::query(&sql)
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(PostgresError::from)?;

        Ok(DeleteOutcome {
            deleted: result.rows_affected(),
        })
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
