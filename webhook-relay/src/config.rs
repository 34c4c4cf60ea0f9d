//! Configuration module for environment variable parsing.
//!
//! Everything is read once at startup. The route table in particular is
//! immutable for the lifetime of the process and shared read-only by every
//! request handler.

use std::collections::{BTreeMap, HashMap};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;
use url::Url;

use crate::util::user_agent::DEFAULT_USER_AGENT;

/// Suffix identifying per-service destination variables, e.g. `N8N_WEBHOOK_URL`.
pub const ROUTE_VAR_SUFFIX: &str = "_WEBHOOK_URL";

/// Immutable mapping from service name to destination URL.
///
/// Service names are case-insensitive: they are stored uppercased, the way
/// they appear in the environment, and listed lowercased.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteTable {
    routes: BTreeMap<String, Url>,
}

impl RouteTable {
    /// Build the table from `{SERVICE}_WEBHOOK_URL` style key/value pairs.
    ///
    /// Keys without the suffix are ignored. Empty or unparseable URLs are
    /// skipped with a warning so one bad variable cannot take the relay down.
    pub fn from_vars<'a, I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut routes = BTreeMap::new();

        for (key, value) in vars {
            let key = key.to_ascii_uppercase();
            let service = match key.strip_suffix(ROUTE_VAR_SUFFIX) {
                Some(service) if !service.is_empty() => service,
                _ => continue,
            };

            let value = value.trim();
            if value.is_empty() {
                warn!(env_var = %key, "route_url_empty_skipped");
                continue;
            }

            match Url::parse(value) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {
                    routes.insert(service.to_string(), url);
                }
                Ok(url) => {
                    warn!(env_var = %key, scheme = url.scheme(), "route_url_scheme_unsupported");
                }
                Err(e) => {
                    warn!(env_var = %key, error = %e, "route_url_invalid_skipped");
                }
            }
        }

        Self { routes }
    }

    /// Look up the destination for a service, ignoring case.
    pub fn resolve(&self, service: &str) -> Option<&Url> {
        self.routes.get(&service.to_ascii_uppercase())
    }

    /// Configured service names, lowercased and sorted. URLs are never exposed.
    pub fn services(&self) -> Vec<String> {
        self.routes.keys().map(|k| k.to_ascii_lowercase()).collect()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Service name to destination URL mapping
    pub routes: RouteTable,

    /// Outbound request timeout in milliseconds
    pub request_timeout_ms: u64,

    /// User-Agent sent downstream when the caller supplied none
    pub user_agent: String,

    /// Service the legacy provider aliases forward to
    pub legacy_service: String,

    /// Rate limit window in milliseconds
    pub rate_limit_window_ms: u64,

    /// Maximum requests per client within one window (0 disables limiting)
    pub rate_limit_max_requests: usize,

    /// Allowed CORS origins; `None` allows any origin
    pub allowed_origins: Option<Vec<String>>,

    /// Largest inbound body accepted, in bytes
    pub max_body_bytes: usize,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(env::vars())
    }

    /// Load configuration from an explicit set of key/value pairs.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        Config {
            port: parse_or(&vars, "PORT", 3000),

            routes: RouteTable::from_vars(vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))),

            request_timeout_ms: parse_or(&vars, "REQUEST_TIMEOUT_MS", 30_000),

            user_agent: non_empty(&vars, "PROXY_USER_AGENT")
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),

            legacy_service: non_empty(&vars, "LEGACY_SERVICE").unwrap_or_else(|| "n8n".to_string()),

            rate_limit_window_ms: parse_or(&vars, "RATE_LIMIT_WINDOW_MS", 15 * 60 * 1000),

            rate_limit_max_requests: parse_or(&vars, "RATE_LIMIT_MAX_REQUESTS", 100),

            allowed_origins: parse_origins(&vars, "ALLOWED_ORIGINS"),

            max_body_bytes: parse_or(&vars, "MAX_BODY_BYTES", 2 * 1024 * 1024),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_millis(self.rate_limit_window_ms)
    }
}

/// Parse a variable, falling back to `default` when unset or malformed.
fn parse_or<T: FromStr>(vars: &HashMap<String, String>, name: &str, default: T) -> T {
    let Some(raw) = vars.get(name) else {
        return default;
    };

    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

fn non_empty(vars: &HashMap<String, String>, name: &str) -> Option<String> {
    vars.get(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a comma-separated origin list. `*` anywhere in the list means any origin.
fn parse_origins(vars: &HashMap<String, String>, name: &str) -> Option<Vec<String>> {
    let origins: Vec<String> = vars
        .get(name)?
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        None
    } else {
        Some(origins)
    }
}
