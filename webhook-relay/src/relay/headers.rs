//! Header shaping for both directions of a hop.

use axum::http::{
    header::{CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, HOST, TRANSFER_ENCODING},
    HeaderMap, HeaderName, HeaderValue,
};

use crate::util::user_agent::ensure_user_agent;

/// Stripped from inbound headers before forwarding.
const OUTBOUND_STRIPPED: [HeaderName; 4] = [HOST, CONTENT_LENGTH, TRANSFER_ENCODING, CONNECTION];

/// Framing is redone by the local server, so these are not relayed back.
const RELAY_STRIPPED: [HeaderName; 2] = [TRANSFER_ENCODING, CONNECTION];

/// Build the outbound header map from the caller's headers.
///
/// `default_content_type` is only applied when the caller declared none.
pub fn outbound_headers(
    inbound: &HeaderMap,
    user_agent: &HeaderValue,
    default_content_type: Option<&'static str>,
) -> HeaderMap {
    let mut headers = inbound.clone();

    ensure_user_agent(&mut headers, user_agent);

    if let Some(content_type) = default_content_type {
        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
    }

    for name in OUTBOUND_STRIPPED.iter() {
        headers.remove(name);
    }

    headers
}

/// Copy downstream response headers for relaying to the caller.
pub fn relayed_headers(downstream: &HeaderMap) -> HeaderMap {
    let mut headers = downstream.clone();
    for name in RELAY_STRIPPED.iter() {
        headers.remove(name);
    }
    headers
}
