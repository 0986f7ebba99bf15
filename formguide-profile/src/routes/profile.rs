use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use formguide_shared::errors::{AppError, AppResult};
use formguide_shared::types::auth::AuthUser;
use formguide_shared::types::ApiResponse;

use crate::models::{Profile, ProfileSections};
use crate::AppState;

/// The caller's profile, or `null` before the first save.
pub async fn get_profile(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Option<Profile>>>> {
    let profile = state.profiles.get(user.id)?;
    Ok(Json(ApiResponse::ok(profile)))
}

pub async fn upsert_profile(
    user: AuthUser,
    State(state): State<AppState>,
    body: Result<Json<ProfileSections>, JsonRejection>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let Json(sections) = body.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    let profile = state.profiles.save(user.id, sections)?;
    Ok(Json(ApiResponse::ok_with_message(profile, "profile saved")))
}
