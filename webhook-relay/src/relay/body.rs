//! Inbound body classification and outbound re-encoding.
//!
//! The declared content type is inspected exactly once, when the request is
//! ingested, and the result is carried as an [`InboundBody`] variant.

use axum::body::Bytes;
use url::form_urlencoded;

/// Content type used for form bodies when the caller declared none.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

/// Content type used for JSON bodies when the caller declared none.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// An inbound body, decoded according to its declared content type.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundBody {
    /// `application/x-www-form-urlencoded` fields in arrival order
    FormEncoded(Vec<(String, String)>),
    /// `application/json` document, object keys kept in arrival order
    Json(serde_json::Value),
    /// Anything else, or a JSON body that did not parse
    Raw(Bytes),
}

impl InboundBody {
    /// Decode `bytes` according to the declared content type.
    pub fn decode(content_type: Option<&str>, bytes: Bytes) -> Self {
        match content_type.map(essence).as_deref() {
            Some("application/x-www-form-urlencoded") => {
                InboundBody::FormEncoded(form_urlencoded::parse(&bytes).into_owned().collect())
            }
            Some("application/json") => match serde_json::from_slice(&bytes) {
                Ok(value) => InboundBody::Json(value),
                Err(e) => {
                    tracing::debug!(error = %e, body_length = bytes.len(), "json_body_passthrough");
                    InboundBody::Raw(bytes)
                }
            },
            _ => InboundBody::Raw(bytes),
        }
    }

    /// Serialize the body for the outbound request.
    pub fn encode(&self) -> Bytes {
        match self {
            InboundBody::FormEncoded(fields) => Bytes::from(
                form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(fields)
                    .finish(),
            ),
            InboundBody::Json(value) => Bytes::from(value.to_string()),
            InboundBody::Raw(bytes) => bytes.clone(),
        }
    }

    /// Content type to send when the caller did not declare one.
    pub fn default_content_type(&self) -> Option<&'static str> {
        match self {
            InboundBody::FormEncoded(_) => Some(FORM_CONTENT_TYPE),
            InboundBody::Json(_) => Some(JSON_CONTENT_TYPE),
            InboundBody::Raw(_) => None,
        }
    }

    /// First value of a form field, if this is a form body.
    pub fn form_field(&self, name: &str) -> Option<&str> {
        match self {
            InboundBody::FormEncoded(fields) => fields
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }
}

/// Media type without parameters, lowercased: `Application/JSON; charset=utf-8` -> `application/json`.
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
