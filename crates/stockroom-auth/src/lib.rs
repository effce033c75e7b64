//! Authentication and authorization for Stockroom.
//!
//! - [`token`]: HS256 credentials and typed [`Claims`]
//! - [`permissions`]: [`Role`], [`Permission`] and the static role table
//! - [`password`]: Argon2id hashing
//! - [`middleware`]: the authentication middleware and authorization guards

pub mod error;
pub mod middleware;
pub mod password;
pub mod permissions;
pub mod token;

pub use error::AuthError;
pub use middleware::{
    AuthContext, AuthState, authentication_middleware, ensure_not_outranked,
    ensure_self_or_privileged, require_permission, require_roles,
};
pub use password::{hash_password, verify_password};
pub use permissions::{Permission, Role, UnknownRole, has_permission, permissions_for, role_table};
pub use token::{Claims, DEFAULT_TOKEN_LIFETIME, JwtError, JwtService};
