//! The webhook router: resolve, reshape, forward once, relay.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::http::{HeaderValue, Method};
use reqwest::{redirect::Policy, Client};
use tracing::{error, info, warn};
use url::Url;

use super::body::InboundBody;
use super::headers::{outbound_headers, relayed_headers};
use super::types::{InboundRequest, RelayedResponse};
use crate::config::{Config, RouteTable};
use crate::error::ForwardError;
use crate::util::user_agent::parse_user_agent;

/// Stateless router shared across all request handlers.
///
/// Cloning is cheap; the route table and HTTP client live behind an `Arc`
/// and are never written after construction.
#[derive(Clone)]
pub struct WebhookRouter {
    inner: Arc<RouterInner>,
}

struct RouterInner {
    routes: RouteTable,
    client: Client,
    user_agent: HeaderValue,
}

impl WebhookRouter {
    pub fn new(routes: RouteTable, client: Client, user_agent: HeaderValue) -> Self {
        Self {
            inner: Arc::new(RouterInner {
                routes,
                client,
                user_agent,
            }),
        }
    }

    /// Build the router and its outbound client from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .redirect(Policy::none())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self::new(
            config.routes.clone(),
            client,
            parse_user_agent(&config.user_agent),
        ))
    }

    pub fn routes(&self) -> &RouteTable {
        &self.inner.routes
    }

    /// Forward one inbound request to its configured destination.
    ///
    /// Exactly one outbound call is made for a configured service and none
    /// for an unconfigured one. The downstream status, headers and body are
    /// returned untouched.
    pub async fn forward(&self, request: InboundRequest) -> Result<RelayedResponse, ForwardError> {
        let InboundRequest {
            service,
            method,
            headers,
            query,
            body,
        } = request;

        let Some(base) = self.inner.routes.resolve(&service) else {
            warn!(service = %service, "webhook_service_unconfigured");
            return Err(ForwardError::UnconfiguredService {
                service,
                available: self.inner.routes.services(),
            });
        };

        let url = destination(base, query.as_deref());
        let has_body = method != Method::GET;
        let default_content_type = if has_body {
            body.default_content_type()
        } else {
            None
        };

        let mut builder = self
            .inner
            .client
            .request(method.clone(), url.clone())
            .headers(outbound_headers(
                &headers,
                &self.inner.user_agent,
                default_content_type,
            ));

        if has_body {
            builder = builder.body(body.encode());
        }

        info!(
            service = %service,
            method = %method,
            destination_host = url.host_str().unwrap_or_default(),
            body_kind = body_kind(&body),
            "webhook_forward_starting"
        );

        let started = Instant::now();
        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!(
                    service = %service,
                    timed_out = e.is_timeout(),
                    connect_error = e.is_connect(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "webhook_forward_failed"
                );
                return Err(ForwardError::from_reqwest(&service, e));
            }
        };

        let status = response.status();
        let headers = relayed_headers(response.headers());
        let body = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(
                    service = %service,
                    status_code = status.as_u16(),
                    error = %e,
                    "webhook_forward_body_read_failed"
                );
                return Err(ForwardError::from_reqwest(&service, e));
            }
        };

        info!(
            service = %service,
            status_code = status.as_u16(),
            body_length = body.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "webhook_forward_complete"
        );

        Ok(RelayedResponse {
            status,
            headers,
            body,
        })
    }
}

/// Destination URL with the caller's query string appended to any query the
/// configured URL already carries.
fn destination(base: &Url, query: Option<&str>) -> Url {
    let mut url = base.clone();
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        let merged = match base.query() {
            Some(existing) if !existing.is_empty() => format!("{existing}&{query}"),
            _ => query.to_string(),
        };
        url.set_query(Some(&merged));
    }
    url
}

fn body_kind(body: &InboundBody) -> &'static str {
    match body {
        InboundBody::FormEncoded(_) => "form",
        InboundBody::Json(_) => "json",
        InboundBody::Raw(_) => "raw",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::Bytes;
    use axum::http::{
        header::{CONTENT_TYPE, HOST, USER_AGENT},
        HeaderMap, StatusCode,
    };

    use crate::test_support::{spawn_downstream, unreachable_url, DownstreamReply};

    fn router_for(vars: Vec<(&str, String)>) -> WebhookRouter {
        WebhookRouter::from_config(&Config::from_vars(vars)).unwrap()
    }

    fn form_request(service: &str, body: &'static str) -> InboundRequest {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        headers.insert(HOST, HeaderValue::from_static("relay.example.test"));
        InboundRequest::new(
            service,
            Method::POST,
            headers,
            None,
            Bytes::from_static(body.as_bytes()),
        )
    }

    #[test]
    fn test_destination_merges_query() {
        let base = Url::parse("https://example.test/hook?token=abc").unwrap();
        assert_eq!(
            destination(&base, Some("x=1")).as_str(),
            "https://example.test/hook?token=abc&x=1"
        );

        let bare = Url::parse("https://example.test/hook").unwrap();
        assert_eq!(destination(&bare, Some("x=1")).as_str(), "https://example.test/hook?x=1");
        assert_eq!(destination(&bare, None).as_str(), "https://example.test/hook");
        assert_eq!(destination(&bare, Some("")).as_str(), "https://example.test/hook");
    }

    #[tokio::test]
    async fn test_forward_form_body_to_configured_service() {
        let downstream = spawn_downstream(DownstreamReply::json(StatusCode::OK, r#"{"ok":true}"#)).await;
        let router = router_for(vec![("N8N_WEBHOOK_URL", downstream.url("/hook"))]);

        let relayed = router
            .forward(form_request("n8n", "From=%2B1555&Body=hi"))
            .await
            .unwrap();

        assert_eq!(relayed.status, StatusCode::OK);
        assert_eq!(relayed.body, Bytes::from_static(br#"{"ok":true}"#));
        assert_eq!(relayed.headers["x-downstream"], "relay-test");

        let calls = downstream.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, Method::POST);
        assert_eq!(calls[0].uri.path(), "/hook");
        assert_eq!(calls[0].body, Bytes::from_static(b"From=%2B1555&Body=hi"));
        assert_eq!(calls[0].headers[USER_AGENT], "Railway-Proxy/1.0");
        assert_ne!(
            calls[0].headers.get(HOST).and_then(|h| h.to_str().ok()),
            Some("relay.example.test")
        );
    }

    #[tokio::test]
    async fn test_forward_resolves_case_insensitively() {
        let downstream = spawn_downstream(DownstreamReply::json(StatusCode::OK, "{}")).await;
        let router = router_for(vec![("MAKE_WEBHOOK_URL", downstream.url("/make"))]);

        router.forward(form_request("MaKe", "a=1")).await.unwrap();

        assert_eq!(downstream.calls().len(), 1);
        assert_eq!(downstream.calls()[0].uri.path(), "/make");
    }

    #[tokio::test]
    async fn test_forward_unconfigured_service_makes_no_call() {
        let downstream = spawn_downstream(DownstreamReply::json(StatusCode::OK, "{}")).await;
        let router = router_for(vec![("N8N_WEBHOOK_URL", downstream.url("/hook"))]);

        let err = router
            .forward(form_request("zapier", "a=1"))
            .await
            .unwrap_err();

        match err {
            ForwardError::UnconfiguredService { service, available } => {
                assert_eq!(service, "zapier");
                assert_eq!(available, vec!["n8n".to_string()]);
            }
            other => panic!("Expected UnconfiguredService, got {other:?}"),
        }
        assert!(downstream.calls().is_empty());
    }

    #[tokio::test]
    async fn test_forward_relays_error_status_verbatim() {
        let downstream = spawn_downstream(DownstreamReply::json(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"error":"bad payload"}"#,
        ))
        .await;
        let router = router_for(vec![("N8N_WEBHOOK_URL", downstream.url("/hook"))]);

        let relayed = router.forward(form_request("n8n", "a=1")).await.unwrap();

        assert_eq!(relayed.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(relayed.body, Bytes::from_static(br#"{"error":"bad payload"}"#));
    }

    #[tokio::test]
    async fn test_forward_relays_redirect_without_following() {
        let downstream = spawn_downstream(
            DownstreamReply::json(StatusCode::FOUND, "{}").with_header("location", "/elsewhere"),
        )
        .await;
        let router = router_for(vec![("N8N_WEBHOOK_URL", downstream.url("/hook"))]);

        let relayed = router.forward(form_request("n8n", "a=1")).await.unwrap();

        assert_eq!(relayed.status, StatusCode::FOUND);
        assert_eq!(relayed.headers["location"], "/elsewhere");
        let calls = downstream.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].uri.path(), "/hook");
    }

    #[tokio::test]
    async fn test_forward_get_sends_no_body_and_keeps_query() {
        let downstream = spawn_downstream(DownstreamReply::json(StatusCode::OK, "{}")).await;
        let router = router_for(vec![("N8N_WEBHOOK_URL", downstream.url("/hook?token=abc"))]);

        let request = InboundRequest::new(
            "n8n",
            Method::GET,
            HeaderMap::new(),
            Some("hub.challenge=42".to_string()),
            Bytes::new(),
        );
        router.forward(request).await.unwrap();

        let calls = downstream.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, Method::GET);
        assert_eq!(calls[0].uri.query(), Some("token=abc&hub.challenge=42"));
        assert!(calls[0].body.is_empty());
        assert!(!calls[0].headers.contains_key(CONTENT_TYPE));
    }

    #[tokio::test]
    async fn test_forward_json_body_canonicalized() {
        let downstream = spawn_downstream(DownstreamReply::json(StatusCode::OK, "{}")).await;
        let router = router_for(vec![("N8N_WEBHOOK_URL", downstream.url("/hook"))]);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let request = InboundRequest::new(
            "n8n",
            Method::PUT,
            headers,
            None,
            Bytes::from_static(b"{ \"event\" : \"message\" }"),
        );
        router.forward(request).await.unwrap();

        let calls = downstream.calls();
        assert_eq!(calls[0].method, Method::PUT);
        assert_eq!(calls[0].body, Bytes::from_static(br#"{"event":"message"}"#));
        assert_eq!(calls[0].headers[CONTENT_TYPE], "application/json");
    }

    #[tokio::test]
    async fn test_forward_connection_refused_is_forwarding_failed() {
        let router = router_for(vec![("N8N_WEBHOOK_URL", unreachable_url().await)]);

        let err = router
            .forward(form_request("n8n", "a=1"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ForwardError::ForwardingFailed { timed_out: false, .. }
        ));
    }

    #[tokio::test]
    async fn test_forward_timeout_is_bounded() {
        let downstream = spawn_downstream(
            DownstreamReply::json(StatusCode::OK, "{}").delayed(Duration::from_secs(5)),
        )
        .await;
        let router = router_for(vec![
            ("N8N_WEBHOOK_URL", downstream.url("/hook")),
            ("REQUEST_TIMEOUT_MS", "200".to_string()),
        ]);

        let started = Instant::now();
        let err = router
            .forward(form_request("n8n", "a=1"))
            .await
            .unwrap_err();

        assert!(matches!(err, ForwardError::ForwardingFailed { timed_out: true, .. }));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(downstream.calls().len(), 1);
    }
}
