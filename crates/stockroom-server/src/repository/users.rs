use serde_json::Map;
use stockroom_api::{ApiError, ApiResult, CacheStatus};
use stockroom_auth::{AuthError, Role, hash_password};
use stockroom_storage::{DynDocumentStore, Filter, FindOptions, SortSpec, StorageError};

use super::{from_document, from_documents, new_id, storage_failure, to_document};
use crate::cache::{EntityCache, keys};
use crate::models::{
    CreateUserRequest, ListPage, USERS, UpdateUserRequest, UserDetails, UserQuery, UserRecord,
    UserSummary, normalize_email,
};

const NOT_FOUND: &str = "User not found";
const EMAIL_TAKEN: &str = "User with this email already exists";

#[derive(Clone)]
pub struct UserRepository {
    store: DynDocumentStore,
    cache: EntityCache,
}

impl UserRepository {
    pub fn new(store: DynDocumentStore, cache: EntityCache) -> Self {
        Self { store, cache }
    }

    pub async fn get(&self, id: &str) -> ApiResult<(UserDetails, CacheStatus)> {
        let key = keys::user_key(id);
        if let Some(user) = self.cache.get::<UserDetails>(&key).await {
            return Ok((user, CacheStatus::Hit));
        }

        let user = self
            .find(id)
            .await
            .map_err(storage_failure("Error fetching user details"))?
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))?
            .details();

        self.cache.set(&key, &user, self.cache.ttls().detail).await;
        Ok((user, CacheStatus::Miss))
    }

    pub async fn list(&self, query: &UserQuery) -> ApiResult<(ListPage<UserSummary>, CacheStatus)> {
        let key = keys::user_list_key(query);
        if let Some(page) = self.cache.get::<ListPage<UserSummary>>(&key).await {
            return Ok((page, CacheStatus::Hit));
        }

        let filter = query.filter();
        let total = self
            .store
            .count(USERS, &filter)
            .await
            .map_err(storage_failure("Error counting users"))?;

        let options = FindOptions::new()
            .with_sort(query.sort.spec())
            .with_skip(query.page.skip())
            .with_limit(query.page.limit);
        let docs = self
            .store
            .find(USERS, &filter, &options)
            .await
            .map_err(storage_failure("Error fetching users"))?;
        let records: Vec<UserRecord> =
            from_documents(docs).map_err(storage_failure("Error processing users data"))?;

        let page = ListPage {
            items: records.iter().map(UserRecord::summary).collect(),
            total,
        };
        self.cache.set(&key, &page, self.cache.ttls().list).await;
        Ok((page, CacheStatus::Miss))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StorageError> {
        let filter = Filter::eq("email", normalize_email(email));
        self.store
            .find_one(USERS, &filter)
            .await?
            .map(from_document)
            .transpose()
    }

    /// Signs up a validated request as a `user`. Nothing is cached until
    /// the first read.
    pub async fn create(&self, request: CreateUserRequest) -> ApiResult<UserDetails> {
        let email = request.normalized_email();
        if self
            .find_by_email(&email)
            .await
            .map_err(storage_failure("Error processing request"))?
            .is_some()
        {
            return Err(ApiError::conflict(EMAIL_TAKEN));
        }

        let password = request.password.clone().unwrap_or_default();
        let hash = hash_blocking(password).await?;
        let record = request.into_record(new_id(), hash);
        self.insert(&record).await?;
        tracing::info!(user_id = %record.id, "user created");
        Ok(record.details())
    }

    /// Inserts a fully formed record, refusing a taken email.
    pub async fn insert(&self, record: &UserRecord) -> ApiResult<()> {
        let doc = to_document(record).map_err(storage_failure("Error creating user"))?;
        self.store.insert(USERS, doc).await.map_err(|err| {
            if err.is_already_exists() {
                ApiError::conflict(EMAIL_TAKEN)
            } else {
                storage_failure("Error creating user")(err)
            }
        })
    }

    pub async fn update(&self, id: &str, request: &UpdateUserRequest) -> ApiResult<UserDetails> {
        if let Some(email) = request.normalized_email() {
            let owner = self
                .find_by_email(&email)
                .await
                .map_err(storage_failure("Error processing request"))?;
            if owner.is_some_and(|u| u.id != id) {
                return Err(ApiError::conflict(EMAIL_TAKEN));
            }
        }

        let hash = match request.new_password() {
            Some(password) => Some(hash_blocking(password.to_string()).await?),
            None => None,
        };
        let changes = request.changes(hash);
        if changes.is_empty() {
            return Err(ApiError::bad_request("No fields to update"));
        }

        self.apply(id, changes, "Error updating user").await?;

        self.find(id)
            .await
            .map_err(storage_failure("Error getting updated user"))?
            .map(|u| u.details())
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))
    }

    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        let outcome = self
            .store
            .delete_by_id(USERS, id)
            .await
            .map_err(storage_failure("Error deleting user"))?;
        if outcome.deleted == 0 {
            return Err(ApiError::not_found(NOT_FOUND));
        }

        self.invalidate(id).await;
        tracing::info!(user_id = %id, "user deleted");
        Ok(())
    }

    /// Sets the role of an existing user and returns its summary.
    pub async fn assign_role(&self, id: &str, role: Role) -> ApiResult<UserSummary> {
        let mut user = self
            .find(id)
            .await
            .map_err(storage_failure("Error checking user existence"))?
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

        let mut changes = Map::new();
        changes.insert("role".into(), role.as_str().into());
        self.apply(id, changes, "Error updating user role").await?;

        tracing::info!(user_id = %id, role = %role, "user role changed");
        user.role = role;
        Ok(user.summary())
    }

    /// Current role straight from the store; authorization never trusts
    /// the cached copy.
    pub async fn role_of(&self, id: &str) -> ApiResult<Role> {
        self.find(id)
            .await
            .map_err(storage_failure("Error fetching user details"))?
            .map(|u| u.role)
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))
    }

    /// Every user, ordered by id. Used by the cache refresher.
    pub async fn load_all(&self) -> Result<Vec<UserRecord>, StorageError> {
        let options = FindOptions::new().with_sort(SortSpec::ascending("id"));
        let docs = self.store.find(USERS, &Filter::All, &options).await?;
        from_documents(docs)
    }

    pub fn cache(&self) -> &EntityCache {
        &self.cache
    }

    async fn find(&self, id: &str) -> Result<Option<UserRecord>, StorageError> {
        self.store
            .find_by_id(USERS, id)
            .await?
            .map(from_document)
            .transpose()
    }

    async fn apply(
        &self,
        id: &str,
        changes: stockroom_storage::Document,
        failure: &'static str,
    ) -> ApiResult<()> {
        let outcome = self
            .store
            .update_by_id(USERS, id, changes)
            .await
            .map_err(storage_failure(failure))?;
        if outcome.matched == 0 {
            return Err(ApiError::not_found(NOT_FOUND));
        }
        self.invalidate(id).await;
        Ok(())
    }

    async fn invalidate(&self, id: &str) {
        self.cache
            .invalidate_entity(&keys::user_key(id), keys::USER_LIST_PREFIX)
            .await;
    }
}

/// Argon2 is CPU-bound; keep it off the async workers.
async fn hash_blocking(password: String) -> ApiResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::internal(e.to_string()))?
        .map_err(ApiError::from)
}
