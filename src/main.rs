use anyhow::Context;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

use tenant_gateway::upstream::supabase::SupabaseClient;
use tenant_gateway::{app, config, load_registry, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up SUPABASE_URL, SUPABASE_KEY, etc.
    let _ = dotenvy::dotenv();

    let config = config::config();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level)))
        .init();

    tracing::info!("Starting tenant gateway in {:?} mode", config.environment);
    config.validate()?;

    let registry = load_registry(config)?;
    tracing::info!(
        "Loaded {} tenants [{}] fingerprint={}",
        registry.len(),
        registry.ids().join(", "),
        registry.fingerprint()
    );

    let client = SupabaseClient::new(&config.supabase).context("failed to build upstream client")?;
    let state = AppState::with_supabase(config.clone(), registry, client);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app(state).into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
