use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use formguide_shared::{HealthCheck, HealthResponse, HealthStatus};

use crate::AppState;

pub async fn health_check(State(state): State<AppState>) -> Response {
    let checks = vec![
        HealthCheck::from_probe("database", state.profiles.store().ping()),
        HealthCheck::from_probe("storage", state.profiles.storage().ping().await),
    ];
    let response = HealthResponse::healthy("formguide-profile", env!("CARGO_PKG_VERSION")).with_checks(checks);

    let status = match response.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status, Json(response)).into_response()
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
