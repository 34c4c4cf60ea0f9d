//! Twilio Relay - single-destination WhatsApp webhook proxy.
//!
//! Exposes only `POST /whatsapp-webhook`, forwarding each call to the
//! legacy service (`N8N_WEBHOOK_URL` by default) and always answering
//! Twilio with empty TwiML so it never retries.

use std::net::SocketAddr;

use anyhow::{bail, Context, Result};
use tokio::net::TcpListener;
use tracing::info;
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

    info!("twilio_relay_starting");

    let config = Config::from_env();
    if config.routes.resolve(&config.legacy_service).is_none() {
        bail!(
            "{}{} must be set",
            config.legacy_service.to_ascii_uppercase(),
            webhook_relay::config::ROUTE_VAR_SUFFIX
        );
    }

    info!(
        port = config.port,
        legacy_service = %config.legacy_service,
        request_timeout_ms = config.request_timeout_ms,
        "config_loaded"
    );

    let router = WebhookRouter::from_config(&config)?;
    let port = config.port;
    let app = build_app(AppState::new(config, router, Surface::TwilioOnly));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "twilio_relay_listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("twilio_relay_shutdown_complete");

    Ok(())
}
