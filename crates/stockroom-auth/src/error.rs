//! Authentication and authorization errors.

use axum::response::{IntoResponse, Response};
use stockroom_api::ApiError;

use crate::token::JwtError;

/// Errors raised by the guards and credential helpers.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No usable credential: missing header, bad format, bad token.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// The credential has expired.
    #[error("Token has expired")]
    TokenExpired,

    /// Authenticated but not allowed.
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    /// Hashing or signing failed.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AuthError {
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden { .. })
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => Self::TokenExpired,
            JwtError::InvalidSignature | JwtError::Malformed { .. } => {
                Self::unauthorized("Invalid token")
            }
            JwtError::Encoding { message } | JwtError::InvalidKey { message } => {
                Self::Internal { message }
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthorized { message } => ApiError::Unauthorized(message),
            AuthError::TokenExpired => ApiError::unauthorized("Token has expired"),
            AuthError::Forbidden { message } => ApiError::Forbidden(message),
            AuthError::Internal { message } => {
                tracing::error!(error = %message, "auth internal error");
                ApiError::internal("Internal server error")
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
