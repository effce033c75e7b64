//! # stockroom-storage
//!
//! Storage abstraction layer for the Stockroom server.
//!
//! This crate defines the [`DocumentStore`] trait and the query types every
//! backend understands. It contains no implementations; see
//! `stockroom-db-memory` and `stockroom-db-postgres`.
//!
//! ## Example
//!
//! ```ignore
//! use stockroom_storage::{DocumentStore, Filter, FindOptions, SortSpec};
//!
//! let filter = Filter::eq("category", "stationery")
//!     .and(Filter::search(&["name", "description"], "pen"));
//! let options = FindOptions::new()
//!     .with_sort(SortSpec::ascending("price"))
//!     .with_skip(0)
//!     .with_limit(10);
//!
//! let products = store.find("products", &filter, &options).await?;
//! let total = store.count("products", &filter).await?;
//! ```

mod error;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use traits::DocumentStore;
pub use types::{
    DeleteOutcome, Document, Filter, FindOptions, ID_FIELD, SortDirection, SortSpec,
    UpdateOutcome, document_id,
};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shareable document store.
pub type DynDocumentStore = std::sync::Arc<dyn DocumentStore>;
