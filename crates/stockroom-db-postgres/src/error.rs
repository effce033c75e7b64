//! Error types for the PostgreSQL storage backend.

use sqlx_core::error::Error as SqlxError;
use stockroom_storage::StorageError;

/// PostgreSQL error code for unique violations (23505).
pub const PG_UNIQUE_VIOLATION: &str = "23505";

/// Checks if a sqlx error has a specific PostgreSQL error code.
pub fn has_pg_error_code(err: &SqlxError, code: &str) -> bool {
    if let SqlxError::Database(db_err) = err {
        db_err.code().as_deref() == Some(code)
    } else {
        false
    }
}

/// Errors specific to the PostgreSQL storage backend.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database driver error.
    #[error("Database error: {0}")]
    Sqlx(#[from] SqlxError),

    /// Collection name is not a safe SQL identifier.
    #[error("Invalid collection name: {name}")]
    InvalidCollection { name: String },
}

impl PostgresError {
    #[must_use]
    pub fn invalid_collection(name: impl Into<String>) -> Self {
        Self::InvalidCollection { name: name.into() }
    }
}

impl From<PostgresError> for StorageError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Sqlx(e) => match e {
                SqlxError::PoolTimedOut | SqlxError::PoolClosed | SqlxError::Io(_) => {
                    StorageError::connection_error(e.to_string())
                }
                SqlxError::Tls(_) => StorageError::connection_error(e.to_string()),
                other => StorageError::internal(other.to_string()),
            },
            PostgresError::InvalidCollection { name } => {
                StorageError::invalid_document(format!("invalid collection name: {name}"))
            }
        }
    }
}

/// Result type alias for PostgreSQL operations.
pub type Result<T> = std::result::Result<T, PostgresError>;
