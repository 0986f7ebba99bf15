use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use formguide_shared::errors::AppResult;
use formguide_shared::middleware::ValidatedJson;
use formguide_shared::types::auth::AuthUser;
use formguide_shared::types::ApiResponse;

use crate::services::auth_service::RegisterInput;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(max = 100, message = "username must be at most 100 characters"))]
    pub username: Option<String>,
    #[validate(email(message = "invalid email format"))]
    pub email: Option<String>,
    #[validate(length(max = 128, message = "password must be at most 128 characters"))]
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<AuthUser>>)> {
    let user = state
        .auth
        .register(RegisterInput {
            username: req.username.unwrap_or_default(),
            email: req.email.unwrap_or_default(),
            password: req.password.unwrap_or_default(),
            confirm_password: req.confirm_password.unwrap_or_default(),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok_with_message(
            user,
            "registration successful, please check your email to verify your account",
        )),
    ))
}
