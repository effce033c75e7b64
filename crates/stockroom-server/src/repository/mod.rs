//! Read-through, invalidate-on-write access to the primary store.
//!
//! Reads consult the [`EntityCache`](crate::cache::EntityCache) first and
//! populate it on a miss. Writes go to the store only; once the store has
//! acknowledged them the detail key and every list key of that kind are
//! dropped, before the caller sees success.

pub mod products;
pub mod users;

pub use products::ProductRepository;
pub use users::UserRepository;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use stockroom_api::ApiError;
use stockroom_storage::{Document, StorageError};

/// Maps a store failure to a fixed client message, logging the detail.
pub(crate) fn storage_failure(message: &'static str) -> impl FnOnce(StorageError) -> ApiError {
    move |err| {
        tracing::error!(error = %err, category = %err.category(), "{}", message);
        ApiError::internal(message)
    }
}

pub(crate) fn to_document<T: Serialize>(value: &T) -> Result<Document, StorageError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(doc)) => Ok(doc),
        Ok(_) => Err(StorageError::invalid_document("entity is not a JSON object")),
        Err(e) => Err(StorageError::invalid_document(e.to_string())),
    }
}

pub(crate) fn from_document<T: DeserializeOwned>(doc: Document) -> Result<T, StorageError> {
    serde_json::from_value(Value::Object(doc))
        .map_err(|e| StorageError::invalid_document(e.to_string()))
}

pub(crate) fn from_documents<T: DeserializeOwned>(
    docs: Vec<Document>,
) -> Result<Vec<T>, StorageError> {
    docs.into_iter().map(from_document).collect()
}

/// Fresh identity for a new entity.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
