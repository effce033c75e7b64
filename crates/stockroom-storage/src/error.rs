//! Failures reported by document store backends.

use std::fmt;

/// Errors a [`DocumentStore`](crate::DocumentStore) can return.
///
/// A missing document is not an error: lookups return `Option` and writes
/// report how many documents they matched.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Insert of an id the collection already holds.
    #[error("Document already exists: {collection}/{id}")]
    AlreadyExists { collection: String, id: String },

    /// The document or query cannot be stored or evaluated.
    #[error("Invalid document: {message}")]
    InvalidDocument { message: String },

    /// The backend could not be reached.
    #[error("Connection error: {message}")]
    ConnectionError { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl StorageError {
    #[must_use]
    pub fn already_exists(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            collection: collection.into(),
            id: id.into(),
        }
    }

    #[must_use]
    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn connection_error(message: impl Into<String>) -> Self {
        Self::ConnectionError {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Coarse class of the failure, used as a log field.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::AlreadyExists { .. } => ErrorCategory::Conflict,
            Self::InvalidDocument { .. } => ErrorCategory::Validation,
            Self::ConnectionError { .. } => ErrorCategory::Infrastructure,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Conflict,
    Validation,
    Infrastructure,
    Internal,
}

impl ErrorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Conflict => "conflict",
            Self::Validation => "validation",
            Self::Infrastructure => "infrastructure",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
