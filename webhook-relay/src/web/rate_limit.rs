//! Per-client IP rate limiting using the GCRA algorithm.
//!
//! Each peer IP gets its own governor limiter, created lazily on first
//! request. `RATE_LIMIT_MAX_REQUESTS` is the burst and the window is spread
//! evenly over it, so a client that waits a full window is back to its
//! whole budget.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter as GovernorLimiter};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::util::timestamp;

/// Shortest interval between stale-entry sweeps.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

struct ClientEntry {
    limiter: DefaultDirectRateLimiter,
    last_seen: Instant,
}

struct Limits {
    clients: DashMap<IpAddr, ClientEntry>,
    quota: Quota,
    /// An entry idle this long has fully replenished and can be dropped.
    stale_after: Duration,
}

/// Per-client limiter; a disabled limiter admits everything.
#[derive(Clone)]
pub struct RateLimiter {
    limits: Option<Arc<Limits>>,
}

impl RateLimiter {
    /// `max_requests` per `window` per client. `max_requests == 0` disables limiting.
    pub fn new(max_requests: usize, window: Duration) -> Self {
        let Some(burst) = NonZeroU32::new(u32::try_from(max_requests).unwrap_or(u32::MAX)) else {
            info!("rate_limit_disabled");
            return Self { limits: None };
        };

        let Some(quota) = Quota::with_period(window / burst.get()) else {
            warn!(window_ms = window.as_millis() as u64, "rate_limit_window_invalid_disabled");
            return Self { limits: None };
        };

        info!(
            max_requests = burst.get(),
            window_ms = window.as_millis() as u64,
            "rate_limit_configured"
        );

        Self {
            limits: Some(Arc::new(Limits {
                clients: DashMap::new(),
                quota: quota.allow_burst(burst),
                stale_after: window,
            })),
        }
    }

    /// Record a request from `client` and report whether it is allowed.
    pub fn check(&self, client: IpAddr) -> bool {
        let Some(limits) = &self.limits else {
            return true;
        };

        let mut entry = limits.clients.entry(client).or_insert_with(|| ClientEntry {
            limiter: GovernorLimiter::direct(limits.quota),
            last_seen: Instant::now(),
        });
        entry.last_seen = Instant::now();
        entry.limiter.check().is_ok()
    }

    /// Drop clients idle for longer than the window. Returns how many were removed.
    pub fn cleanup_stale(&self) -> usize {
        let Some(limits) = &self.limits else {
            return 0;
        };

        let before = limits.clients.len();
        limits
            .clients
            .retain(|_, entry| entry.last_seen.elapsed() < limits.stale_after);
        let removed = before.saturating_sub(limits.clients.len());
        if removed > 0 {
            debug!(removed, remaining = limits.clients.len(), "rate_limit_stale_clients_removed");
        }
        removed
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.limits.as_ref().map_or(0, |limits| limits.clients.len())
    }

    /// Sweep stale clients in the background for the life of the runtime.
    ///
    /// Does nothing when limiting is disabled or no tokio runtime is running.
    pub fn spawn_cleanup_task(&self) {
        let Some(limits) = &self.limits else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };

        let limiter = self.clone();
        let period = limits.stale_after.max(MIN_SWEEP_INTERVAL);
        runtime.spawn(async move {
            let mut tick = tokio::time::interval(period);
            tick.tick().await;
            loop {
                tick.tick().await;
                limiter.cleanup_stale();
            }
        });
    }
}

/// Middleware rejecting clients over their budget with `429`.
pub async fn rate_limit(
    State(limiter): State<RateLimiter>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let client = connect_info
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    if !limiter.check(client) {
        warn!(client = %client, path = %request.uri().path(), "rate_limit_exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": "Too many requests, please try again later.",
                "timestamp": timestamp(),
            })),
        )
            .into_response();
    }

    next.run(request).await
}
