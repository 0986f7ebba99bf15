use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::Deserialize;

use formguide_shared::errors::AppResult;
use formguide_shared::types::ApiResponse;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyEmailQuery {
    pub token: Option<String>,
}

/// Redeems the emailed link. Redirects to the frontend when one is
/// configured, otherwise answers with JSON.
pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyEmailQuery>,
) -> AppResult<Response> {
    let user = state
        .auth
        .verify_email(query.token.as_deref().unwrap_or_default())
        .await?;

    if let Some(url) = &state.verification_redirect_url {
        return Ok(Redirect::to(&verified_redirect(url)).into_response());
    }

    Ok(Json(ApiResponse::ok_with_message(user, "email verified successfully")).into_response())
}

fn verified_redirect(base: &str) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}verified=true")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_appends_flag() {
        assert_eq!(verified_redirect("http://localhost:8080/"), "http://localhost:8080/?verified=true");
        assert_eq!(
            verified_redirect("http://localhost:8080/login?from=email"),
            "http://localhost:8080/login?from=email&verified=true"
        );
    }
}
