pub mod core;
pub mod providers;
pub mod server;

use crate::core::AppConfig;
use crate::providers::{FixerProvider, FreeCurrencyProvider};
use crate::server::AppState;
use anyhow::{Context, Result};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Wires the upstream providers into the HTTP router.
pub fn build_app(config: &AppConfig) -> Result<Router> {
    let fixer = &config.providers.fixer;
    let free_currency = &config.providers.free_currency;
    if fixer.api_key.is_empty() {
        warn!("No rates API key configured (API_KEY); the rates provider will reject requests");
    }
    if free_currency.api_key.is_empty() {
        warn!(
            "No conversion API key configured (FCC_API_KEY); the conversion provider will reject requests"
        );
    }

    let rates = FixerProvider::new(fixer).context("Failed to set up rates provider")?;
    let converter =
        FreeCurrencyProvider::new(free_currency).context("Failed to set up conversion provider")?;
    let state = AppState::new(Arc::new(rates), Arc::new(converter));

    Ok(server::create_router(state, &config.server.public_dir))
}

/// Serves `app` on `listener` until Ctrl-C.
pub async fn serve(listener: TcpListener, app: Router) -> Result<()> {
    let addr = listener.local_addr()?;
    info!("Listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}

pub async fn run(config: AppConfig) -> Result<()> {
    info!("fxproxy starting...");
    debug!("Loaded config: {config:#?}");

    let app = build_app(&config)?;
    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    serve(listener, app).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
