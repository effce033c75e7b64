//! HTTP handlers. Each validates input at the boundary, then delegates to
//! a repository.

pub mod auth;
pub mod health;
pub mod products;
pub mod roles;
pub mod users;

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use stockroom_api::{ApiError, ApiResult};
use uuid::Uuid;

/// JSON body whose rejection is reported in the uniform error envelope.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => {
                tracing::debug!(error = %rejection.body_text(), "rejected request body");
                Err(ApiError::bad_request("Invalid request body"))
            }
        }
    }
}

/// Query string whose rejection is reported in the uniform error envelope.
#[derive(Debug, Clone)]
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(QueryParams(value)),
            Err(rejection) => {
                tracing::debug!(error = %rejection.body_text(), "rejected query string");
                Err(ApiError::bad_request("Invalid query parameters"))
            }
        }
    }
}

/// Canonical product id taken from the `{id}` path segment.
#[derive(Debug, Clone)]
pub struct ProductId(pub String);

/// Canonical user id taken from the `{id}` path segment.
#[derive(Debug, Clone)]
pub struct UserId(pub String);

impl<S: Send + Sync> FromRequestParts<S> for ProductId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        path_id(parts, state, "Invalid product ID").await.map(ProductId)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for UserId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        path_id(parts, state, "Invalid user ID").await.map(UserId)
    }
}

/// Undecodable segments fail the same way as malformed ids.
async fn path_id<S: Send + Sync>(
    parts: &mut Parts,
    state: &S,
    invalid: &'static str,
) -> ApiResult<String> {
    match Path::<String>::from_request_parts(parts, state).await {
        Ok(Path(raw)) => parse_id(&raw, invalid),
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "rejected path id");
            Err(ApiError::bad_request(invalid))
        }
    }
}

/// Parses a path id as a UUID and returns it in canonical hyphenated form.
pub fn parse_id(raw: &str, invalid: &'static str) -> ApiResult<String> {
    Uuid::parse_str(raw.trim())
        .map(|id| id.hyphenated().to_string())
        .map_err(|_| ApiError::bad_request(invalid))
}

/// Message for a read, depending on where it was served from.
fn read_message(hit: bool, from_cache: &'static str, from_store: &'static str) -> &'static str {
    if hit { from_cache } else { from_store }
}
