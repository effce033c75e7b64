//! The document store trait every backend implements.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::types::{DeleteOutcome, Document, Filter, FindOptions, UpdateOutcome};

/// A collection-oriented document store.
///
/// Documents are JSON objects keyed by their `id` field. Collections are
/// created implicitly on first use. Implementations must be thread-safe;
/// individual operations are atomic per document, nothing more.
///
/// # Example
///
/// ```ignore
/// use stockroom_storage::{DocumentStore, Filter, StorageError};
///
/// async fn find_user(store: &dyn DocumentStore, email: &str) -> Result<bool, StorageError> {
///     Ok(store
///         .find_one("users", &Filter::eq("email", email))
///         .await?
///         .is_some())
/// }
/// ```
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts a new document.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidDocument` if the document has no string `id`,
    /// and `StorageError::AlreadyExists` if the id is taken.
    async fn insert(&self, collection: &str, document: Document) -> Result<(), StorageError>;

    /// Reads a document by id. Returns `None` when absent.
    async fn find_by_id(&self, collection: &str, id: &str)
    -> Result<Option<Document>, StorageError>;

    /// Returns the first document matching `filter`, in id order.
    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StorageError>;

    /// Returns the documents matching `filter`, sorted and windowed by `options`.
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StorageError>;

    /// Counts the documents matching `filter`, ignoring any windowing.
    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StorageError>;

    /// Sets the given top-level fields on the document with `id`.
    ///
    /// Fields absent from `changes` are left untouched; the `id` field cannot
    /// be changed. A missing document is reported as `matched == 0`, not as
    /// an error.
    async fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        changes: Document,
    ) -> Result<UpdateOutcome, StorageError>;

    /// Removes the document with `id`. A missing document is `deleted == 0`.
    async fn delete_by_id(&self, collection: &str, id: &str)
    -> Result<DeleteOutcome, StorageError>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}
