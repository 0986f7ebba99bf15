use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use formguide_shared::middleware::metrics_middleware;

use crate::AppState;

pub mod health;
pub mod profile;
pub mod upload;

/// Profile routes under `/api/profile`; every one of them sits behind the session gate.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    let api = Router::new()
        .route("/", get(profile::get_profile).put(profile::upsert_profile))
        .route(
            "/upload",
            post(upload::upload_document).layer(DefaultBodyLimit::max(max_upload_bytes)),
        );

    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        .nest("/api/profile", api)
        .route_layer(middleware::from_fn(metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
