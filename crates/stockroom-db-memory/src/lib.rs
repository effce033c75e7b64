//! In-memory document store backend for the Stockroom server.
//!
//! This crate provides an in-memory implementation of the `DocumentStore`
//! trait from `stockroom-storage`, using a papaya lock-free HashMap for
//! concurrent access.
//!
//! # Example
//!
//! ```ignore
//! use stockroom_db_memory::MemoryStore;
//! use stockroom_storage::{DocumentStore, Filter};
//!
//! let store = MemoryStore::new();
//! let doc = serde_json::json!({"id": "p1", "name": "Pen"});
//! store.insert("products", doc.as_object().unwrap().clone()).await?;
//! let found = store.find_one("products", &Filter::eq("name", "Pen")).await?;
//! ```

pub mod query;
pub mod storage;

pub use stockroom_storage::{DocumentStore, StorageError};
pub use storage::MemoryStore;

/// Creates a new shareable in-memory document store.
pub fn create_memory_store() -> stockroom_storage::DynDocumentStore {
    std::sync::Arc::new(MemoryStore::new())
}
