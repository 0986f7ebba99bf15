use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use formguide_shared::errors::AppResult;
use formguide_shared::middleware::ValidatedJson;
use formguide_shared::types::ApiResponse;

use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct OtpRequest {
    pub email: Option<String>,
}

async fn issue(state: &AppState, req: OtpRequest) -> AppResult<Json<ApiResponse<Option<()>>>> {
    state
        .auth
        .request_otp(req.email.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(ApiResponse::ack("OTP sent to your email")))
}

pub async fn send_otp(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<OtpRequest>,
) -> AppResult<Json<ApiResponse<Option<()>>>> {
    issue(&state, req).await
}

/// Same workflow as send-otp, exposed under the forgot-password name.
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<OtpRequest>,
) -> AppResult<Json<ApiResponse<Option<()>>>> {
    issue(&state, req).await
}
