use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use formguide_shared::errors::AppResult;
use formguide_shared::middleware::ValidatedJson;
use formguide_shared::types::ApiResponse;

use crate::services::auth_service::ResendOutcome;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct ResendVerificationRequest {
    #[validate(email(message = "invalid email format"))]
    pub email: Option<String>,
}

pub async fn resend_verification(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ResendVerificationRequest>,
) -> AppResult<Json<ApiResponse<Option<()>>>> {
    let outcome = state
        .auth
        .resend_verification(req.email.as_deref().unwrap_or_default())
        .await?;

    let message = match outcome {
        ResendOutcome::Sent => "verification email sent",
        ResendOutcome::AlreadyVerified => "email already verified",
    };
    Ok(Json(ApiResponse::ack(message)))
}
