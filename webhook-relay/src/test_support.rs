//! Throwaway HTTP servers for exercising the relay end to end.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::AppendHeaders,
    Router,
};
use tokio::net::TcpListener;

/// Serve `app` on an ephemeral local port.
pub async fn spawn_app(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    addr
}

/// A URL on a local port nothing is listening on.
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/hook")
}

/// A request as seen by the fake downstream.
#[derive(Debug, Clone)]
pub struct CapturedCall {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// What the fake downstream answers with.
#[derive(Debug, Clone)]
pub struct DownstreamReply {
    status: StatusCode,
    body: &'static str,
    delay: Duration,
    extra_headers: Vec<(&'static str, &'static str)>,
}

impl DownstreamReply {
    pub fn json(status: StatusCode, body: &'static str) -> Self {
        Self {
            status,
            body,
            delay: Duration::ZERO,
            extra_headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &'static str, value: &'static str) -> Self {
        self.extra_headers.push((name, value));
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Fake workflow endpoint recording every call it receives.
pub struct Downstream {
    addr: SocketAddr,
    calls: Arc<Mutex<Vec<CapturedCall>>>,
}

impl Downstream {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn calls(&self) -> Vec<CapturedCall> {
        self.calls.lock().unwrap().clone()
    }
}

pub async fn spawn_downstream(reply: DownstreamReply) -> Downstream {
    let calls: Arc<Mutex<Vec<CapturedCall>>> = Arc::default();
    let recorded = calls.clone();

    let app = Router::new().fallback(
        move |method: Method, uri: Uri, headers: HeaderMap, body: Bytes| {
            let recorded = recorded.clone();
            let reply = reply.clone();
            async move {
                recorded.lock().unwrap().push(CapturedCall {
                    method,
                    uri,
                    headers,
                    body,
                });
                tokio::time::sleep(reply.delay).await;
                (
                    reply.status,
                    [
                        ("content-type", "application/json"),
                        ("x-downstream", "relay-test"),
                    ],
                    AppendHeaders(reply.extra_headers),
                    reply.body,
                )
            }
        },
    );

    let addr = spawn_app(app).await;
    Downstream { addr, calls }
}
