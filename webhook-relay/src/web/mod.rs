//! Web server module for receiving inbound webhooks.
//!
//! This module provides:
//! - `ANY /webhook/{service}`: generic relay with downstream passthrough
//! - `POST /whatsapp-webhook`, `POST /twilio-webhook`: legacy aliases that
//!   always answer with empty TwiML
//! - `GET /health` and `GET /`: status and endpoint listing
//!
//! CORS, rate limiting, request tracing and the panic boundary are layered
//! on in [`server::build_app`].

pub mod handlers;
pub mod rate_limit;
pub mod server;
pub mod twiml;

pub use handlers::{
    health, legacy_webhook, not_found, relay_webhook, AppState, HealthResponse, Surface,
};
pub use rate_limit::RateLimiter;
pub use server::{build_app, shutdown_signal};
pub use twiml::{acknowledgement, forward_and_acknowledge, EMPTY_TWIML};
