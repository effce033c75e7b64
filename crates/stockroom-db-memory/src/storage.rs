use std::sync::Arc;

use async_trait::async_trait;
use papaya::HashMap as PapayaHashMap;
use stockroom_storage::{
    DeleteOutcome, Document, DocumentStore, Filter, FindOptions, ID_FIELD, StorageError,
    UpdateOutcome, document_id,
};

use crate::query::{compare_documents, matches};

pub type StorageKey = String; // Format: "collection/id"

pub(crate) fn make_storage_key(collection: &str, id: &str) -> StorageKey {
    format!("{collection}/{id}")
}

/// In-memory document store backed by a papaya lock-free HashMap.
///
/// All collections share one map keyed `collection/id`. Scans walk the
/// whole map, which is fine for tests and small single-node deployments.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    data: Arc<PapayaHashMap<StorageKey, Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            data: Arc::new(PapayaHashMap::new()),
        }
    }

    /// Number of documents in a collection.
    pub fn len(&self, collection: &str) -> usize {
        let prefix = format!("{collection}/");
        let guard = self.data.pin();
        guard.keys().filter(|k| k.starts_with(&prefix)).count()
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Snapshot of the documents of one collection that match `filter`.
    fn scan(&self, collection: &str, filter: &Filter) -> Vec<Document> {
        let prefix = format!("{collection}/");
        let guard = self.data.pin();
        guard
            .iter()
            .filter(|(k, _)| k.starts_with(&prefix))
            .filter(|(_, doc)| matches(filter, doc))
            .map(|(_, doc)| doc.clone())
            .collect()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: &str, document: Document) -> Result<(), StorageError> {
        let id = document_id(&document)
            .ok_or_else(|| StorageError::invalid_document("document has no string id"))?
            .to_string();
        let key = make_storage_key(collection, &id);
        let guard = self.data.pin();

        match guard.try_insert(key, document) {
            Ok(_) => Ok(()),
            Err(_) => Err(StorageError::already_exists(collection, id)),
        }
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, StorageError> {
        let key = make_storage_key(collection, id);
        let guard = self.data.pin();
        Ok(guard.get(&key).cloned())
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, StorageError> {
        let docs = self.scan(collection, filter);
        Ok(docs
            .into_iter()
            .min_by(|a, b| compare_documents(a, b, None)))
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StorageError> {
        let mut docs = self.scan(collection, filter);
        docs.sort_by(|a, b| compare_documents(a, b, options.sort.as_ref()));

        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let limit = options
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);

        Ok(docs.into_iter().skip(skip).take(limit).collect())
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StorageError> {
        Ok(self.scan(collection, filter).len() as u64)
    }

    async fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        changes: Document,
    ) -> Result<UpdateOutcome, StorageError> {
        let key = make_storage_key(collection, id);
        let guard = self.data.pin();

        let updated = guard.update(key, |current| {
            let mut next = current.clone();
            for (field, value) in &changes {
                if field != ID_FIELD {
                    next.insert(field.clone(), value.clone());
                }
            }
            next
        });

        let matched = u64::from(updated.is_some());
        tracing::trace!(collection, id, matched, "memory update");
        Ok(UpdateOutcome { matched })
    }

    async fn delete_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<DeleteOutcome, StorageError> {
        let key = make_storage_key(collection, id);
        let guard = self.data.pin();
        let deleted = u64::from(guard.remove(&key).is_some());
        Ok(DeleteOutcome { deleted })
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use stockroom_storage::SortSpec;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().expect("object")
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        for (id, name, price, category) in [
            ("p1", "Pen", 1.5, "stationery"),
            ("p2", "Notebook", 4.0, "stationery"),
            ("p3", "Mug", 8.0, "kitchen"),
            ("p4", "Pencil", 0.5, "stationery"),
        ] {
            store
                .insert(
                    "products",
                    doc(json!({"id": id, "name": name, "price": price, "category": category})),
                )
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_insert_and_find_by_id() {
        let store = seeded().await;
        let found = store.find_by_id("products", "p3").await.unwrap().unwrap();
        assert_eq!(found["name"], "Mug");
        assert!(store.find_by_id("products", "nope").await.unwrap().is_none());
        assert!(store.find_by_id("users", "p3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_duplicate_id_conflicts() {
        let store = seeded().await;
        let err = store
            .insert("products", doc(json!({"id": "p1", "name": "Other"})))
            .await
            .unwrap_err();
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn test_insert_without_id_is_invalid() {
        let store = MemoryStore::new();
        let err = store
            .insert("products", doc(json!({"name": "No id"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidDocument { .. }));
    }

    #[tokio::test]
    async fn test_find_filters_sorts_and_pages() {
        let store = seeded().await;
        let filter = Filter::eq("category", "stationery");
        let options = FindOptions::new()
            .with_sort(SortSpec::ascending("price"))
            .with_skip(1)
            .with_limit(2);

        let page = store.find("products", &filter, &options).await.unwrap();
        let ids: Vec<&str> = page.iter().filter_map(document_id).collect();
        assert_eq!(ids, vec!["p1", "p2"]);

        assert_eq!(store.count("products", &filter).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_update_sets_only_given_fields() {
        let store = seeded().await;
        let outcome = store
            .update_by_id("products", "p1", doc(json!({"price": 2.0, "id": "hijack"})))
            .await
            .unwrap();
        assert_eq!(outcome.matched, 1);

        let updated = store.find_by_id("products", "p1").await.unwrap().unwrap();
        assert_eq!(updated["price"], 2.0);
        assert_eq!(updated["name"], "Pen");
        assert_eq!(updated["id"], "p1");

        let missing = store
            .update_by_id("products", "zzz", doc(json!({"price": 1})))
            .await
            .unwrap();
        assert_eq!(missing.matched, 0);
        assert!(store.find_by_id("products", "zzz").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_reports_count() {
        let store = seeded().await;
        assert_eq!(store.delete_by_id("products", "p2").await.unwrap().deleted, 1);
        assert_eq!(store.delete_by_id("products", "p2").await.unwrap().deleted, 0);
        assert_eq!(store.len("products"), 3);
    }

    #[tokio::test]
    async fn test_find_one_by_field() {
        let store = seeded().await;
        let found = store
            .find_one("products", &Filter::eq("name", "Mug"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found["id"], "p3");
    }
}
