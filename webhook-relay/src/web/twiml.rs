//! Provider compatibility adapter for Twilio-style callers.
//!
//! Twilio retries aggressively when a webhook does not answer with valid
//! TwiML, so the legacy aliases always acknowledge with an empty
//! `<Response>` document, whatever happened downstream.

use axum::{
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{info, warn};

use crate::relay::{InboundRequest, WebhookRouter};

/// Empty TwiML document: acknowledge and take no further action.
pub const EMPTY_TWIML: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Response></Response>"#;

/// `200 OK` with the empty TwiML acknowledgement.
pub fn acknowledgement() -> Response {
    (
        StatusCode::OK,
        [(CONTENT_TYPE, "application/xml")],
        EMPTY_TWIML,
    )
        .into_response()
}

/// Forward through the router and acknowledge regardless of the outcome.
///
/// The downstream response is discarded; only the attempt is guaranteed.
pub async fn forward_and_acknowledge(router: &WebhookRouter, request: InboundRequest) -> Response {
    let service = request.service.clone();
    let from = request.body.form_field("From").map(str::to_owned);
    let message_sid = request.body.form_field("MessageSid").map(str::to_owned);

    info!(
        service = %service,
        from = from.as_deref().unwrap_or_default(),
        message_sid = message_sid.as_deref().unwrap_or_default(),
        "legacy_webhook_received"
    );

    match router.forward(request).await {
        Ok(relayed) => {
            info!(
                service = %service,
                downstream_status = relayed.status.as_u16(),
                message_sid = message_sid.as_deref().unwrap_or_default(),
                "legacy_forward_complete"
            );
        }
        Err(e) => {
            warn!(
                service = %service,
                error = %e,
                message_sid = message_sid.as_deref().unwrap_or_default(),
                "legacy_forward_failed"
            );
        }
    }

    acknowledgement()
}
