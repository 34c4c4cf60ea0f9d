//! Webhook Relay - stateless forwarding of provider webhooks.
//!
//! This library provides shared modules for the two relay binaries:
//! - `webhook-relay`: generic router, `/webhook/{service}` plus legacy aliases
//! - `twilio-relay`: single-destination proxy exposing only `/whatsapp-webhook`
//!
//! ## Architecture
//!
//! ```text
//! Provider → web handlers → WebhookRouter → {SERVICE}_WEBHOOK_URL → relayed response
//!                 └─ legacy aliases → TwiML acknowledgement (always 200)
//! ```

pub mod config;
pub mod error;
pub mod relay;
pub mod util;
pub mod web;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use config::{Config, RouteTable};
pub use error::ForwardError;
pub use relay::{InboundBody, InboundRequest, RelayedResponse, WebhookRouter};
pub use web::{build_app, AppState, Surface};
