use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::types::auth::Claims;

/// Thirty days.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 30 * 24 * 60 * 60;

#[derive(Debug, thiserror::Error)]
pub enum TokenConfigError {
    #[error("JWT signing secret is missing or empty")]
    MissingSecret,
    #[error("token ttl must be positive, got {0}")]
    InvalidTtl(i64),
}

/// Bearer token as handed to a client after login.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

/// Issues and verifies HS256 bearer tokens with a single process-wide secret.
///
/// Construction is the only place the secret is checked, so a running
/// service always holds a usable key.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
}

impl TokenService {
    pub fn new(secret: &str, ttl_secs: i64) -> Result<Self, TokenConfigError> {
        if secret.trim().is_empty() {
            return Err(TokenConfigError::MissingSecret);
        }
        if ttl_secs <= 0 {
            return Err(TokenConfigError::InvalidTtl(ttl_secs));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_secs,
        })
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    pub fn issue(&self, user_id: Uuid) -> AppResult<IssuedToken> {
        self.issue_at(user_id, Utc::now())
    }

    /// Issue a token as if it had been minted at `issued_at`.
    pub fn issue_at(&self, user_id: Uuid, issued_at: DateTime<Utc>) -> AppResult<IssuedToken> {
        let claims = Claims::new(user_id, issued_at, self.ttl_secs);
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::internal(format!("JWT encoding failed: {e}")))?;

        Ok(IssuedToken {
            token,
            token_type: "Bearer",
            expires_in: self.ttl_secs,
        })
    }

    /// Returns the identity id a token asserts. Malformed, mis-signed and
    /// expired tokens are all rejected with the same unauthorized error.
    pub fn verify(&self, token: &str) -> AppResult<Uuid> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            tracing::debug!(reason = ?e.kind(), "bearer token rejected");
            AppError::unauthorized()
        })?;

        if data.claims.is_expired() {
            return Err(AppError::unauthorized());
        }

        Ok(data.claims.sub)
    }
}
