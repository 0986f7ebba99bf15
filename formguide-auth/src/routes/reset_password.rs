use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use formguide_shared::errors::AppResult;
use formguide_shared::middleware::ValidatedJson;
use formguide_shared::types::ApiResponse;

use crate::services::auth_service::ResetPasswordInput;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: Option<String>,
    pub otp: Option<String>,
    #[validate(length(max = 128, message = "password must be at most 128 characters"))]
    pub new_password: Option<String>,
    pub confirm_password: Option<String>,
}

pub async fn reset_password(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ResetPasswordRequest>,
) -> AppResult<Json<ApiResponse<Option<()>>>> {
    state
        .auth
        .reset_password(ResetPasswordInput {
            email: req.email.unwrap_or_default(),
            otp: req.otp.unwrap_or_default(),
            new_password: req.new_password.unwrap_or_default(),
            confirm_password: req.confirm_password.unwrap_or_default(),
        })
        .await?;

    Ok(Json(ApiResponse::ack("password reset successful")))
}
