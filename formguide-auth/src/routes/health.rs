use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use formguide_shared::{HealthCheck, HealthResponse, HealthStatus};

use crate::AppState;

/// Liveness plus a database round-trip.
pub async fn health_check(State(state): State<AppState>) -> Response {
    let response = HealthResponse::healthy("formguide-auth", env!("CARGO_PKG_VERSION"))
        .with_checks(vec![HealthCheck::from_probe("database", state.auth.store().ping())]);

    let status = match response.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status, Json(response)).into_response()
}

/// Prometheus exposition; 404 when no recorder is installed.
pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
