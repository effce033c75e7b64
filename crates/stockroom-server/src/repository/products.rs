use stockroom_api::{ApiError, ApiResult, CacheStatus};
use stockroom_storage::{DynDocumentStore, Filter, FindOptions, SortSpec, StorageError};

use super::{from_document, from_documents, new_id, storage_failure, to_document};
use crate::cache::{EntityCache, keys};
use crate::models::{
    CreateProductRequest, ListPage, PRODUCTS, Product, ProductQuery, UpdateProductRequest,
};

const NOT_FOUND: &str = "Product not found";

#[derive(Clone)]
pub struct ProductRepository {
    store: DynDocumentStore,
    cache: EntityCache,
}

impl ProductRepository {
    pub fn new(store: DynDocumentStore, cache: EntityCache) -> Self {
        Self { store, cache }
    }

    pub async fn get(&self, id: &str) -> ApiResult<(Product, CacheStatus)> {
        let key = keys::product_key(id);
        if let Some(product) = self.cache.get::<Product>(&key).await {
            return Ok((product, CacheStatus::Hit));
        }

        let product = self
            .find(id)
            .await
            .map_err(storage_failure("Error fetching product"))?
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

        self.cache
            .set(&key, &product, self.cache.ttls().detail)
            .await;
        Ok((product, CacheStatus::Miss))
    }

    pub async fn list(&self, query: &ProductQuery) -> ApiResult<(ListPage<Product>, CacheStatus)> {
        let key = keys::product_list_key(query);
        if let Some(page) = self.cache.get::<ListPage<Product>>(&key).await {
            return Ok((page, CacheStatus::Hit));
        }

        let filter = query.filter();
        let total = self
            .store
            .count(PRODUCTS, &filter)
            .await
            .map_err(storage_failure("Error counting products"))?;

        let options = FindOptions::new()
            .with_sort(query.sort.spec())
            .with_skip(query.page.skip())
            .with_limit(query.page.limit);
        let docs = self
            .store
            .find(PRODUCTS, &filter, &options)
            .await
            .map_err(storage_failure("Error fetching products"))?;
        let items = from_documents(docs).map_err(storage_failure("Error processing products data"))?;

        let page = ListPage { items, total };
        self.cache.set(&key, &page, self.cache.ttls().list).await;
        Ok((page, CacheStatus::Miss))
    }

    /// Inserts a validated product. Nothing is cached until the first read.
    pub async fn create(&self, request: CreateProductRequest) -> ApiResult<Product> {
        let product = request.into_product(new_id());
        let doc = to_document(&product).map_err(storage_failure("Error creating product"))?;
        self.store
            .insert(PRODUCTS, doc)
            .await
            .map_err(storage_failure("Error creating product"))?;
        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    pub async fn update(&self, id: &str, request: &UpdateProductRequest) -> ApiResult<Product> {
        let changes = request.changes();
        if changes.is_empty() {
            return Err(ApiError::bad_request("No fields to update"));
        }

        let outcome = self
            .store
            .update_by_id(PRODUCTS, id, changes)
            .await
            .map_err(storage_failure("Error updating product"))?;
        if outcome.matched == 0 {
            return Err(ApiError::not_found(NOT_FOUND));
        }

        self.invalidate(id).await;

        self.find(id)
            .await
            .map_err(storage_failure("Error getting updated product"))?
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))
    }

    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        let outcome = self
            .store
            .delete_by_id(PRODUCTS, id)
            .await
            .map_err(storage_failure("Error deleting product"))?;
        if outcome.deleted == 0 {
            return Err(ApiError::not_found(NOT_FOUND));
        }

        self.invalidate(id).await;
        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }

    /// Every product, ordered by id. Used by the cache refresher.
    pub async fn load_all(&self) -> Result<Vec<Product>, StorageError> {
        let options = FindOptions::new().with_sort(SortSpec::ascending("id"));
        let docs = self.store.find(PRODUCTS, &Filter::All, &options).await?;
        from_documents(docs)
    }

    pub fn cache(&self) -> &EntityCache {
        &self.cache
    }

    async fn find(&self, id: &str) -> Result<Option<Product>, StorageError> {
        self.store
            .find_by_id(PRODUCTS, id)
            .await?
            .map(from_document)
            .transpose()
    }

    async fn invalidate(&self, id: &str) {
        self.cache
            .invalidate_entity(&keys::product_key(id), keys::PRODUCT_LIST_PREFIX)
            .await;
    }
}
