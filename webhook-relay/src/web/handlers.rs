//! Webhook endpoint handlers.
//!
//! Handlers do no work of their own beyond shaping the inbound request:
//! resolution, forwarding and relaying all happen in [`WebhookRouter`].

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Path, RawQuery, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::relay::{InboundRequest, WebhookRouter};
use crate::util::timestamp;
use crate::web::twiml::{acknowledgement, forward_and_acknowledge};
use crate::Config;

/// Which set of routes a server exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    /// `/webhook/{service}` plus both legacy aliases
    Relay,
    /// Only the WhatsApp alias, as the single-destination proxy
    TwilioOnly,
}

impl Surface {
    /// Endpoint listing shown by the health and not-found documents.
    pub fn endpoints(self) -> Value {
        match self {
            Surface::Relay => json!({
                "health": "GET /health",
                "webhook": "ANY /webhook/{service}",
                "whatsapp": "POST /whatsapp-webhook",
                "twilio": "POST /twilio-webhook",
            }),
            Surface::TwilioOnly => json!({
                "webhook": "POST /whatsapp-webhook",
                "health": "GET /",
            }),
        }
    }

    fn hint(self) -> &'static str {
        match self {
            Surface::Relay => "Use /webhook/{service} for configured services or POST /whatsapp-webhook for Twilio webhooks",
            Surface::TwilioOnly => "Use POST /whatsapp-webhook for Twilio webhooks",
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub router: WebhookRouter,
    pub surface: Surface,
}

impl AppState {
    pub fn new(config: Config, router: WebhookRouter, surface: Surface) -> Self {
        Self {
            config: Arc::new(config),
            router,
            surface,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub services: Vec<String>,
    pub endpoints: Value,
}

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: timestamp(),
        services: state.router.routes().services(),
        endpoints: state.surface.endpoints(),
    })
}

// =============================================================================
// Generic Relay
// =============================================================================

/// `ANY /webhook/{service}`: forward and relay the downstream response.
pub async fn relay_webhook(
    State(state): State<AppState>,
    Path(service): Path<String>,
    method: Method,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(
                service = %service,
                status_code = rejection.status().as_u16(),
                error = %rejection,
                "webhook_body_rejected"
            );
            return body_rejected(rejection);
        }
    };
    let request = InboundRequest::new(service, method, headers, query, body);

    match state.router.forward(request).await {
        Ok(relayed) => relayed.into_response(),
        Err(e) => e.into_response(),
    }
}

/// JSON error for a body the extractor refused, e.g. one over the size limit.
fn body_rejected(rejection: BytesRejection) -> Response {
    (
        rejection.status(),
        Json(json!({
            "error": "Invalid request body",
            "message": rejection.body_text(),
            "timestamp": timestamp(),
        })),
    )
        .into_response()
}

// =============================================================================
// Legacy Provider Aliases
// =============================================================================

/// `POST /whatsapp-webhook` and `POST /twilio-webhook`.
///
/// Forwards to the configured legacy service and always answers with empty
/// TwiML, even when the body could not be read.
pub async fn legacy_webhook(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(
                service = %state.config.legacy_service,
                status_code = rejection.status().as_u16(),
                error = %rejection,
                "legacy_body_rejected"
            );
            return acknowledgement();
        }
    };

    let request = InboundRequest::new(
        state.config.legacy_service.as_str(),
        method,
        headers,
        query,
        body,
    );

    forward_and_acknowledge(&state.router, request).await
}

// =============================================================================
// Fallback
// =============================================================================

/// Catch-all for unmatched routes.
pub async fn not_found(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Endpoint not found",
            "hint": state.surface.hint(),
            "availableEndpoints": state.surface.endpoints(),
        })),
    )
}
