//! Bearer credential authentication.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::AuthError;
use crate::permissions::Role;
use crate::token::JwtService;

/// State required by [`authentication_middleware`].
#[derive(Debug, Clone)]
pub struct AuthState {
    pub jwt: Arc<JwtService>,
}

impl AuthState {
    #[must_use]
    pub fn new(jwt: Arc<JwtService>) -> Self {
        Self { jwt }
    }
}

/// Identity of the caller, inserted into request extensions once the
/// credential has been verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: String,
    pub role: Role,
}

impl AuthContext {
    #[must_use]
    pub fn is_self(&self, target_id: &str) -> bool {
        self.user_id == target_id
    }
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or_else(|| AuthError::unauthorized("Invalid token claims"))
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` value.
///
/// The value must be exactly two space-separated parts; the scheme is
/// matched case-insensitively.
pub fn parse_bearer(header: &str) -> Result<&str, AuthError> {
    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None)
            if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() =>
        {
            Ok(token)
        }
        _ => Err(AuthError::unauthorized("Invalid authorization header format")),
    }
}

/// Verifies the bearer credential and attaches [`AuthContext`] to the request.
///
/// Any failure stops the chain with 401.
pub async fn authentication_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    let header = match req.headers().get(AUTHORIZATION) {
        Some(value) => match value.to_str() {
            Ok(s) => s,
            Err(_) => {
                return AuthError::unauthorized("Invalid authorization header format")
                    .into_response();
            }
        },
        None => {
            tracing::debug!(path = %req.uri().path(), "No Authorization header");
            return AuthError::unauthorized("Authorization header is required").into_response();
        }
    };

    let token = match parse_bearer(header) {
        Ok(token) => token,
        Err(e) => return e.into_response(),
    };

    let claims = match state.jwt.verify(token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "Credential rejected");
            return AuthError::from(e).into_response();
        }
    };

    req.extensions_mut().insert(AuthContext {
        user_id: claims.sub,
        role: claims.role,
    });

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bearer() {
        assert_eq!(parse_bearer("Bearer abc.def").unwrap(), "abc.def");
        assert_eq!(parse_bearer("bearer abc").unwrap(), "abc");
        assert!(parse_bearer("Bearer").is_err());
        assert!(parse_bearer("Bearer ").is_err());
        assert!(parse_bearer("Basic abc").is_err());
        assert!(parse_bearer("Bearer a b").is_err());
        assert!(parse_bearer("Bearer  abc").is_err());
    }
}
