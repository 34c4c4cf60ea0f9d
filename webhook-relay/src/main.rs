//! Webhook Relay - generic provider webhook router.
//!
//! Routes `/webhook/{service}` to the URL in `{SERVICE}_WEBHOOK_URL`,
//! relaying the downstream response verbatim, and serves the legacy
//! `/whatsapp-webhook` and `/twilio-webhook` aliases.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use webhook_relay::web::shutdown_signal;
use webhook_relay::{build_app, AppState, Config, Surface, WebhookRouter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("relay_server_starting");

    // Load configuration from environment
    let config = Config::from_env();
    info!(
        port = config.port,
        services = ?config.routes.services(),
        legacy_service = %config.legacy_service,
        request_timeout_ms = config.request_timeout_ms,
        rate_limit_max_requests = config.rate_limit_max_requests,
        cors_origins = ?config.allowed_origins,
        "config_loaded"
    );

    if config.routes.is_empty() {
        warn!("no_services_configured");
    }

    let router = WebhookRouter::from_config(&config)?;
    let port = config.port;
    let app = build_app(AppState::new(config, router, Surface::Relay));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "relay_server_listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("relay_server_shutdown_complete");

    Ok(())
}
