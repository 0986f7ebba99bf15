use std::sync::Arc;

use axum::extract::FromRef;
use axum::routing::{get, post};
use axum::{middleware, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use formguide_shared::middleware::{metrics_middleware, SessionGate};

pub mod config;
pub mod models;
pub mod routes;
pub mod schema;
pub mod services;
pub mod store;

use services::AuthService;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub gate: SessionGate,
    pub verification_redirect_url: Option<String>,
    pub metrics: Option<PrometheusHandle>,
}

impl FromRef<AppState> for SessionGate {
    fn from_ref(state: &AppState) -> Self {
        state.gate.clone()
    }
}

/// The auth HTTP surface, mounted under `/api/auth`.
pub fn app(state: AppState) -> Router {
    let auth = Router::new()
        .route("/register", post(routes::register::register))
        .route("/verify-email", get(routes::verify_email::verify_email))
        .route("/resend-verification", post(routes::resend_verification::resend_verification))
        .route("/login", post(routes::login::login))
        .route("/send-otp", post(routes::otp::send_otp))
        .route("/forgot-password", post(routes::otp::forgot_password))
        .route("/reset-password", post(routes::reset_password::reset_password))
        .route("/me", get(routes::me::me));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        .nest("/api/auth", auth)
        .route_layer(middleware::from_fn(metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
