use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use formguide_shared::errors::AppResult;
use formguide_shared::middleware::ValidatedJson;
use formguide_shared::types::auth::AuthUser;
use formguide_shared::types::ApiResponse;
use formguide_shared::IssuedToken;

use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    pub email: Option<String>,
    #[validate(length(max = 128, message = "password must be at most 128 characters"))]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub token: IssuedToken,
    pub user: AuthUser,
}

pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let outcome = state
        .auth
        .login(
            req.email.as_deref().unwrap_or_default(),
            req.password.as_deref().unwrap_or_default(),
        )
        .await?;

    Ok(Json(ApiResponse::ok(LoginResponse {
        token: outcome.token,
        user: outcome.user,
    })))
}
