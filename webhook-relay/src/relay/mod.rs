//! Webhook forwarding core.
//!
//! ## Flow
//!
//! ```text
//! InboundRequest → resolve service → reshape headers/body → one outbound call → RelayedResponse
//! ```
//!
//! There is no retry, queue or persistence. A failed forward is reported
//! once as [`ForwardError::ForwardingFailed`](crate::ForwardError).

pub mod body;
pub mod forwarder;
pub mod headers;
pub mod types;

pub use body::{InboundBody, FORM_CONTENT_TYPE, JSON_CONTENT_TYPE};
pub use forwarder::WebhookRouter;
pub use headers::{outbound_headers, relayed_headers};
pub use types::{InboundRequest, RelayedResponse};
