use std::sync::Arc;

use axum::extract::FromRef;
use metrics_exporter_prometheus::PrometheusHandle;

use formguide_auth::store::{CredentialStore, PgCredentialStore, StoreIdentities};
use formguide_shared::clients::db::create_pool;
use formguide_shared::clients::minio::MinioClient;
use formguide_shared::middleware::{init_metrics, init_tracing, SessionGate};
use formguide_shared::tokens::{TokenService, DEFAULT_TOKEN_TTL_SECS};

mod config;
mod models;
mod routes;
mod schema;
mod services;
mod store;

use config::AppConfig;
use services::ProfileService;
use store::PgProfileStore;

#[derive(Clone)]
pub struct AppState {
    pub profiles: Arc<ProfileService>,
    pub gate: SessionGate,
    pub metrics: Option<PrometheusHandle>,
}

impl FromRef<AppState> for SessionGate {
    fn from_ref(state: &AppState) -> Self {
        state.gate.clone()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("formguide-profile");

    let config = AppConfig::load()?;
    let port = config.port;
    let metrics = init_metrics()?;

    let pool = create_pool(&config.database_url, config.db_pool_size)?;
    let credentials: Arc<dyn CredentialStore> = Arc::new(PgCredentialStore::new(pool.clone()));
    let tokens = TokenService::new(&config.jwt_secret, DEFAULT_TOKEN_TTL_SECS)?;

    let minio = MinioClient::new(
        &config.minio_endpoint,
        &config.minio_access_key,
        &config.minio_secret_key,
        &config.minio_bucket,
        &config.minio_public_url,
    )
    .await;

    let state = AppState {
        profiles: Arc::new(ProfileService::new(Arc::new(PgProfileStore::new(pool)), Arc::new(minio))),
        gate: SessionGate::new(tokens, Arc::new(StoreIdentities(credentials))),
        metrics: Some(metrics),
    };

    let app = routes::router(state, config.max_upload_bytes);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "formguide-profile starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
