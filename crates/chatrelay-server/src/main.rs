#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use chatrelay_server::{RelayState, ServerConfig, relay_router};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const LOG_FORMAT_ENV: &str = "CHATRELAY_LOG_FORMAT";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,chatrelay_server=debug".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true);

    if std::env::var(LOG_FORMAT_ENV).is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = ServerConfig::load()?;
    if config.upstream.api_key.is_none() {
        warn!("CHATRELAY_UPSTREAM_API_KEY is not set; chat requests will fail");
    }
    info!(upstream = %config.upstream.url, model = %config.upstream.model, "Starting chat relay");

    let state = Arc::new(RelayState::new(&config)?);
    let app = relay_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Chat relay listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Relay server failed")?;

    info!("Chat relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
