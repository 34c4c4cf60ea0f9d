//! Router assembly, middleware stack and shutdown handling.

use std::any::Any;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Json, Router,
};
use serde_json::json;
use tokio::signal;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, Any as CorsAny, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use super::handlers::{health, legacy_webhook, not_found, relay_webhook, AppState, Surface};
use super::rate_limit::{rate_limit, RateLimiter};
use crate::util::timestamp;
use crate::Config;

/// Build the HTTP application for the state's [`Surface`].
pub fn build_app(state: AppState) -> Router {
    with_middleware(routes(state.surface), &state.config).with_state(state)
}

fn routes(surface: Surface) -> Router<AppState> {
    let routes = Router::new()
        .route("/", get(health))
        .route("/health", get(health));

    match surface {
        Surface::Relay => routes
            .route("/webhook/:service", any(relay_webhook))
            .route("/whatsapp-webhook", post(legacy_webhook).fallback(not_found))
            .route("/twilio-webhook", post(legacy_webhook).fallback(not_found)),
        Surface::TwilioOnly => {
            routes.route("/whatsapp-webhook", post(legacy_webhook).fallback(not_found))
        }
    }
}

/// Fallback, body limit, panic boundary, rate limit, CORS and tracing, innermost first.
fn with_middleware(routes: Router<AppState>, config: &Config) -> Router<AppState> {
    let limiter = RateLimiter::new(config.rate_limit_max_requests, config.rate_limit_window());
    limiter.spawn_cleanup_task();

    routes
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn_with_state(limiter, rate_limit))
        .layer(cors_layer(config.allowed_origins.as_deref()))
        .layer(TraceLayer::new_for_http())
}

/// CORS policy: any origin unless an explicit list is configured.
fn cors_layer(origins: Option<&[String]>) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(CorsAny)
        .allow_headers(CorsAny);

    match origins {
        None => layer.allow_origin(CorsAny),
        Some(origins) => {
            let values: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!(origin = %origin, "cors_origin_invalid_skipped");
                        None
                    }
                })
                .collect();
            layer.allow_origin(AllowOrigin::list(values))
        }
    }
}

/// Error boundary: a panicking handler becomes a JSON 500, the server keeps running.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown error".to_string()
    };

    error!(error = %message, "request_handler_panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "Internal server error",
            "message": message,
            "timestamp": timestamp(),
        })),
    )
        .into_response()
}

/// Create a future that completes when a shutdown signal is received.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "ctrl_c_handler_install_failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "sigterm_handler_install_failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("relay_server_shutting_down");
}
