//! User agent handling for outbound requests.

use axum::http::header::USER_AGENT;
use axum::http::{HeaderMap, HeaderValue};
use tracing::warn;

/// User agent sent downstream when the caller did not provide one.
pub const DEFAULT_USER_AGENT: &str = "Railway-Proxy/1.0";

/// Parse a configured user agent, falling back to the default if it is not a
/// valid header value.
pub fn parse_user_agent(raw: &str) -> HeaderValue {
    HeaderValue::from_str(raw).unwrap_or_else(|_| {
        warn!(user_agent = %raw, "Invalid user agent, using default");
        HeaderValue::from_static(DEFAULT_USER_AGENT)
    })
}

/// Set `User-Agent` to `fallback` unless the caller already sent one.
pub fn ensure_user_agent(headers: &mut HeaderMap, fallback: &HeaderValue) {
    if !headers.contains_key(USER_AGENT) {
        headers.insert(USER_AGENT, fallback.clone());
    }
}
