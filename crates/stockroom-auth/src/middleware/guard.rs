//! Authorization guards. Both run after [`authentication_middleware`]
//! and read the [`AuthContext`] it left in the request extensions.
//!
//! ```ignore
//! use axum::{middleware::from_fn_with_state, routing::get};
//!
//! let route = get(list_users)
//!     .route_layer(from_fn_with_state(Permission::ListUsers, require_permission));
//! ```
//!
//! [`authentication_middleware`]: super::authentication_middleware

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::AuthError;
use crate::permissions::{Permission, Role, has_permission};

use super::auth::AuthContext;

/// Permission policy: the caller's role must hold `permission`.
pub async fn require_permission(
    State(permission): State<Permission>,
    req: Request,
    next: Next,
) -> Response {
    let Some(ctx) = req.extensions().get::<AuthContext>() else {
        return AuthError::unauthorized("Invalid token claims").into_response();
    };

    if !has_permission(ctx.role, permission) {
        tracing::debug!(
            user_id = %ctx.user_id,
            role = %ctx.role,
            permission = %permission,
            "Permission denied"
        );
        return AuthError::forbidden("Insufficient permissions").into_response();
    }

    next.run(req).await
}

/// Role-list policy: the caller's role must be one of `allowed`.
pub async fn require_roles(
    State(allowed): State<&'static [Role]>,
    req: Request,
    next: Next,
) -> Response {
    let Some(ctx) = req.extensions().get::<AuthContext>() else {
        return AuthError::unauthorized("Invalid token claims").into_response();
    };

    if !allowed.contains(&ctx.role) {
        tracing::debug!(user_id = %ctx.user_id, role = %ctx.role, "Role not allowed");
        return AuthError::forbidden("Insufficient role permissions").into_response();
    }

    next.run(req).await
}

/// A `user` may only target their own record; privileged roles may target anyone.
pub fn ensure_self_or_privileged(ctx: &AuthContext, target_id: &str) -> Result<(), AuthError> {
    if ctx.role.is_privileged() || ctx.is_self(target_id) {
        Ok(())
    } else {
        Err(AuthError::forbidden("Access denied"))
    }
}

/// Acting on another account requires at least that account's role, so a
/// `sub_admin` cannot take over a `master_admin` by rewriting credentials.
pub fn ensure_not_outranked(
    ctx: &AuthContext,
    target_id: &str,
    target_role: Role,
) -> Result<(), AuthError> {
    if ctx.is_self(target_id) || !target_role.outranks(ctx.role) {
        Ok(())
    } else {
        tracing::debug!(
            user_id = %ctx.user_id,
            role = %ctx.role,
            target_role = %target_role,
            "Target outranks caller"
        );
        Err(AuthError::forbidden("Access denied"))
    }
}
