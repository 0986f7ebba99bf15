use std::sync::Arc;
use std::time::Duration;

use formguide_auth::config::AppConfig;
use formguide_auth::services::auth_service::spawn_otp_sweeper;
use formguide_auth::services::{AuthService, AuthSettings, Notifier, SecretHasher};
use formguide_auth::store::{CredentialStore, PgCredentialStore, StoreIdentities};
use formguide_auth::AppState;
use formguide_shared::clients::db::create_pool;
use formguide_shared::clients::email::EmailClient;
use formguide_shared::middleware::{init_metrics, init_tracing, SessionGate};
use formguide_shared::TokenService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("formguide-auth");

    let config = AppConfig::load()?;
    let port = config.port;
    let metrics = init_metrics()?;

    let pool = create_pool(&config.database_url, config.db_pool_size)?;
    let store: Arc<dyn CredentialStore> = Arc::new(PgCredentialStore::new(pool));

    let tokens = TokenService::new(&config.jwt_secret, config.token_ttl_secs)?;
    let hasher = SecretHasher::new(config.hash_memory_kib, config.hash_iterations, config.hash_parallelism)?;
    let email = EmailClient::new(&config.email_api_url, &config.email_api_key, &config.from_email, &config.from_name)?;
    let notifier = Notifier::new(Arc::new(email), &config.public_base_url);

    let auth = Arc::new(AuthService::new(
        store.clone(),
        hasher,
        tokens.clone(),
        notifier,
        AuthSettings {
            verification_ttl_secs: config.verification_ttl_secs,
            otp_ttl_secs: config.otp_ttl_secs,
        },
    )?);

    spawn_otp_sweeper(auth.clone(), Duration::from_secs(config.otp_sweep_interval_secs));

    let state = AppState {
        auth,
        gate: SessionGate::new(tokens, Arc::new(StoreIdentities(store))),
        verification_redirect_url: config.verification_redirect_url.clone(),
        metrics: Some(metrics),
    };

    let app = formguide_auth::app(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "formguide-auth starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
