use axum::Json;

use formguide_shared::types::auth::AuthUser;
use formguide_shared::types::ApiResponse;

/// The identity the session gate resolved for this request.
pub async fn me(user: AuthUser) -> Json<ApiResponse<AuthUser>> {
    Json(ApiResponse::ok(user))
}
