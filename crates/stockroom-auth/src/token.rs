//! Signed credentials (HS256 JWT).
//!
//! ```ignore
//! use stockroom_auth::{JwtService, Role};
//!
//! let jwt = JwtService::new(secret.as_bytes(), Duration::from_secs(24 * 3600))?;
//! let token = jwt.issue(&user_id, Role::User)?;
//! let claims = jwt.verify(&token)?;
//! assert_eq!(claims.sub, user_id);
//! ```

use std::fmt;
use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::permissions::Role;

/// Default credential lifetime.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// The token has expired.
    #[error("Token expired")]
    Expired,

    /// The token signature is invalid.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The token could not be decoded or its claims are unusable.
    #[error("Malformed token: {message}")]
    Malformed { message: String },

    /// Failed to encode a token.
    #[error("Failed to encode token: {message}")]
    Encoding { message: String },

    /// The signing secret is unusable.
    #[error("Invalid key: {message}")]
    InvalidKey { message: String },
}

impl JwtError {
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            _ => Self::malformed(err.to_string()),
        }
    }
}

/// Identity claims carried by a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id. Older tokens call it `user_id`.
    #[serde(alias = "user_id")]
    pub sub: String,
    pub role: Role,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
    /// Issued at, seconds since the epoch.
    #[serde(default)]
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: impl Into<String>, role: Role, lifetime: Duration) -> Self {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let lifetime = i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX);
        Self {
            sub: user_id.into(),
            role,
            exp: now.saturating_add(lifetime),
            iat: now,
        }
    }
}

/// Issues and verifies HS256 credentials with one shared secret.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl fmt::Debug for JwtService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtService")
            .field("algorithm", &Algorithm::HS256)
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl JwtService {
    /// Creates a service from a shared secret.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::InvalidKey` if the secret is empty.
    pub fn new(secret: &[u8], lifetime: Duration) -> Result<Self, JwtError> {
        if secret.is_empty() {
            return Err(JwtError::invalid_key("signing secret must not be empty"));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            lifetime,
        })
    }

    #[must_use]
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Issues a credential for `user_id` with `role`.
    pub fn issue(&self, user_id: &str, role: Role) -> Result<String, JwtError> {
        self.encode(&Claims::new(user_id, role, self.lifetime))
    }

    /// Signs arbitrary claims.
    pub fn encode(&self, claims: &Claims) -> Result<String, JwtError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| JwtError::encoding(e.to_string()))
    }

    /// Verifies signature, algorithm and expiry, then returns the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        if data.claims.sub.is_empty() {
            return Err(JwtError::malformed("empty subject"));
        }
        Ok(data.claims)
    }
}
