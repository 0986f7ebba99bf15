use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::tokens::TokenService;
use crate::types::auth::AuthUser;

/// Resolves a token subject to a live identity.
///
/// Implemented by whatever owns the credential records; `Ok(None)` means the
/// identity no longer exists.
pub trait IdentityLookup: Send + Sync {
    fn find_identity(&self, id: Uuid) -> AppResult<Option<AuthUser>>;
}

/// Bearer-token gate in front of protected routes.
#[derive(Clone)]
pub struct SessionGate {
    tokens: TokenService,
    identities: Arc<dyn IdentityLookup>,
}

impl SessionGate {
    pub fn new(tokens: TokenService, identities: Arc<dyn IdentityLookup>) -> Self {
        Self { tokens, identities }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn authorize(&self, headers: &HeaderMap) -> AppResult<AuthUser> {
        let token = extract_bearer_token(headers)?;
        let user_id = self.tokens.verify(token)?;

        match self.identities.find_identity(user_id)? {
            Some(user) => Ok(user),
            None => {
                tracing::debug!(user_id = %user_id, "token subject no longer exists");
                Err(AppError::unauthorized())
            }
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    SessionGate: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let gate = SessionGate::from_ref(state);
        let user = gate.authorize(&parts.headers)?;
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(AppError::unauthorized)?
        .to_str()
        .map_err(|_| AppError::unauthorized())?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(AppError::unauthorized)?;

    Ok(token)
}
