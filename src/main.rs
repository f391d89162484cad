use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

use teenop::config::AppConfig;
use teenop::db;
use teenop::services::auth::supabase::SupabaseAuth;
use teenop::services::payments::stripe::StripeGateway;
use teenop::services::storage::supabase::SupabaseStorage;
use teenop::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    anyhow::ensure!(!config.supabase_url.is_empty(), "SUPABASE_URL must be set");

    if config.stripe_secret_key.is_empty() {
        tracing::warn!("STRIPE_SECRET_KEY not set, payment endpoints will fail");
    }
    if config.stripe_webhook_secret.is_empty() {
        tracing::warn!("STRIPE_WEBHOOK_SECRET not set, webhook deliveries will be rejected");
    }

    let conn = db::init_db(&config.database_url)?;

    let identity = SupabaseAuth::new(config.supabase_url.clone(), config.supabase_anon_key.clone());
    let storage = SupabaseStorage::new(
        config.supabase_url.clone(),
        config.supabase_service_key.clone(),
        config.storage_bucket.clone(),
    );
    let payments = StripeGateway::new(config.stripe_secret_key.clone());

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        identity: Box::new(identity),
        storage: Box::new(storage),
        payments: Box::new(payments),
    });

    let app = teenop::build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
