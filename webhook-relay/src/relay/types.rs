//! Request and response types flowing through the router.

use axum::{
    body::{Body, Bytes},
    http::{header::CONTENT_TYPE, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
};

use super::body::InboundBody;

/// One inbound webhook call, tagged with the service it targets.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    /// Path-derived service identifier
    pub service: String,
    pub method: Method,
    pub headers: HeaderMap,
    /// Raw query string without the leading `?`
    pub query: Option<String>,
    pub body: InboundBody,
}

impl InboundRequest {
    /// Build a request, classifying the body by its declared content type.
    pub fn new(
        service: impl Into<String>,
        method: Method,
        headers: HeaderMap,
        query: Option<String>,
        body: Bytes,
    ) -> Self {
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        let body = InboundBody::decode(content_type, body);

        Self {
            service: service.into(),
            method,
            headers,
            query: query.filter(|q| !q.is_empty()),
            body,
        }
    }
}

/// Downstream response copied back onto the caller's response.
#[derive(Debug, Clone)]
pub struct RelayedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl IntoResponse for RelayedResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
