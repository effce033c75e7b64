//! HTTP middleware for authentication and authorization.
//!
//! ```ignore
//! use axum::{Router, middleware::{from_fn, from_fn_with_state}, routing::get};
//! use stockroom_auth::middleware::{AuthState, authentication_middleware, require_permission};
//!
//! let protected = Router::new()
//!     .route(
//!         "/products",
//!         get(list_products)
//!             .route_layer(from_fn_with_state(Permission::ListProducts, require_permission)),
//!     )
//!     .route_layer(from_fn_with_state(auth_state, authentication_middleware));
//! ```

pub mod auth;
pub mod guard;

pub use auth::{AuthContext, AuthState, authentication_middleware, parse_bearer};
pub use guard::{
    ensure_not_outranked, ensure_self_or_privileged, require_permission, require_roles,
};
