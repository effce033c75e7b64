//! Entities, request payloads and list queries.

pub mod product;
pub mod user;

use serde::{Deserialize, Serialize};

pub use product::{
    CreateProductRequest, PRODUCTS, Product, ProductListParams, ProductQuery, ProductSort,
    UpdateProductRequest,
};
pub use user::{
    AssignRoleRequest, CreateUserRequest, LoginRequest, LoginResponse, USERS, UpdateUserRequest,
    UserDetails, UserListParams, UserQuery, UserRecord, UserSort, UserSummary, normalize_email,
};

/// One page of a listing plus the unpaginated match count. This is the
/// cached payload for list keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListPage<T> {
    pub items: Vec<T>,
    pub total: u64,
}
