//! Fixed-window rate limiting.
//!
//! # Responsibilities
//! - Count requests per caller key inside a fixed window
//! - Advertise the limit state in `X-RateLimit-*` headers
//! - Reject callers over the limit with 429 and `Retry-After`
//! - Periodically drop expired windows
//!
//! # Design Decisions
//! - Key is a truncated SHA-256 of the API token, so raw tokens never sit in
//!   memory; callers without a token are keyed by client IP
//! - The store is constructed at startup and injected, so tests own theirs
//! - Limits are read from live config on each request

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::SharedConfig;
use crate::http::response::GatewayError;
use crate::observability::metrics;
use crate::security::auth::API_TOKEN_HEADER;

pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";
pub const X_RATELIMIT_TYPE: &str = "x-ratelimit-type";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Token,
    Ip,
}

impl KeyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyKind::Token => "token",
            KeyKind::Ip => "ip",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitKey {
    pub key: String,
    pub kind: KeyKind,
}

/// Derive the caller key from the token header, else the client address.
pub fn rate_limit_key(headers: &HeaderMap, client: Option<SocketAddr>) -> RateLimitKey {
    if let Some(token) = headers.get(API_TOKEN_HEADER).and_then(|v| v.to_str().ok()) {
        let digest = format!("{:x}", Sha256::digest(token.as_bytes()));
        return RateLimitKey {
            key: format!("token:{}", &digest[..16]),
            kind: KeyKind::Token,
        };
    }

    let ip = client.map(|addr| addr.ip().to_string()).or_else(|| {
        headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    });

    RateLimitKey {
        key: format!("ip:{}", ip.as_deref().unwrap_or("unknown")),
        kind: KeyKind::Ip,
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started: Instant,
}

/// Outcome of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Whole seconds until the window resets, rounded up.
    pub reset_in: u64,
}

/// Per-key request counters.
#[derive(Debug, Default)]
pub struct RateLimitStore {
    windows: DashMap<String, Window>,
}

impl RateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn hit(&self, key: &str, limit: u32, window: Duration) -> Decision {
        self.hit_at(key, limit, window, Instant::now())
    }

    /// Count a request at `now`. A window strictly older than `window` restarts.
    pub fn hit_at(&self, key: &str, limit: u32, window: Duration, now: Instant) -> Decision {
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert(Window { count: 0, started: now });

        if now.saturating_duration_since(entry.started) > window {
            *entry = Window { count: 0, started: now };
        }
        entry.count = entry.count.saturating_add(1);

        let left = window.saturating_sub(now.saturating_duration_since(entry.started));
        Decision {
            allowed: entry.count <= limit,
            limit,
            remaining: limit.saturating_sub(entry.count),
            reset_in: (left.as_millis() as u64).div_ceil(1000),
        }
    }

    /// Drop windows older than `window`. Returns how many were removed.
    pub fn prune(&self, window: Duration, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started) <= window);
        before.saturating_sub(self.windows.len())
    }
}

/// Prune the store every window length until shutdown.
pub fn spawn_pruner(
    store: Arc<RateLimitStore>,
    settings: SharedConfig,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let window = Duration::from_millis(settings.load().rate_limit.window_ms.max(1));
            tokio::select! {
                _ = tokio::time::sleep(window) => {
                    let removed = store.prune(window, Instant::now());
                    if removed > 0 {
                        tracing::debug!(removed, remaining = store.len(), "Pruned rate limit windows");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Rate limit pruner stopped");
                    break;
                }
            }
        }
    })
}

/// Middleware state: live config plus the injected store.
#[derive(Clone)]
pub struct RateLimitState {
    pub settings: SharedConfig,
    pub store: Arc<RateLimitStore>,
}

pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let limits = state.settings.load().rate_limit.clone();
    if !limits.enabled {
        return next.run(request).await;
    }

    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = rate_limit_key(request.headers(), client);
    let decision = state.store.hit(
        &key.key,
        limits.max_requests,
        Duration::from_millis(limits.window_ms),
    );

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        tracing::warn!(key = %key.key, limit = decision.limit, reset_in = decision.reset_in, "Rate limit exceeded");
        metrics::record_rate_limited(key.kind.as_str());
        GatewayError::RateLimited {
            limit: decision.limit,
            reset_in: decision.reset_in,
        }
        .into_response()
    };

    let headers = response.headers_mut();
    headers.insert(HeaderName::from_static(X_RATELIMIT_LIMIT), HeaderValue::from(decision.limit));
    headers.insert(HeaderName::from_static(X_RATELIMIT_REMAINING), HeaderValue::from(decision.remaining));
    headers.insert(HeaderName::from_static(X_RATELIMIT_RESET), HeaderValue::from(decision.reset_in));
    headers.insert(HeaderName::from_static(X_RATELIMIT_TYPE), HeaderValue::from_static(key.kind.as_str()));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);

    #[test]
    fn test_token_key_is_hashed() {
        let mut headers = HeaderMap::new();
        headers.insert(API_TOKEN_HEADER, HeaderValue::from_static("secret-token"));
        let key = rate_limit_key(&headers, Some("10.0.0.1:5000".parse().unwrap()));
        assert_eq!(key.kind, KeyKind::Token);
        assert!(key.key.starts_with("token:"));
        assert_eq!(key.key.len(), "token:".len() + 16);
        assert!(!key.key.contains("secret"));
    }

    #[test]
    fn test_ip_key_fallbacks() {
        let socket = rate_limit_key(&HeaderMap::new(), Some("10.0.0.1:5000".parse().unwrap()));
        assert_eq!(socket.key, "ip:10.0.0.1");

        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9, 10.0.0.2"));
        assert_eq!(rate_limit_key(&headers, None).key, "ip:203.0.113.9");

        assert_eq!(rate_limit_key(&HeaderMap::new(), None).key, "ip:unknown");
    }

    #[test]
    fn test_window_counts_and_rejects() {
        let store = RateLimitStore::new();
        let now = Instant::now();
        for expected_remaining in [2, 1, 0] {
            let d = store.hit_at("k", 3, WINDOW, now);
            assert!(d.allowed);
            assert_eq!(d.remaining, expected_remaining);
        }
        let d = store.hit_at("k", 3, WINDOW, now + Duration::from_millis(1_500));
        assert!(!d.allowed);
        assert_eq!(d.remaining, 0);
        assert_eq!(d.reset_in, 59);
    }

    #[test]
    fn test_window_restarts_after_expiry() {
        let store = RateLimitStore::new();
        let now = Instant::now();
        store.hit_at("k", 1, WINDOW, now);
        assert!(!store.hit_at("k", 1, WINDOW, now + WINDOW).allowed);
        let d = store.hit_at("k", 1, WINDOW, now + WINDOW + Duration::from_millis(1));
        assert!(d.allowed);
        assert_eq!(d.reset_in, 60);
    }

    #[test]
    fn test_keys_are_independent() {
        let store = RateLimitStore::new();
        let now = Instant::now();
        assert!(store.hit_at("a", 1, WINDOW, now).allowed);
        assert!(store.hit_at("b", 1, WINDOW, now).allowed);
        assert!(!store.hit_at("a", 1, WINDOW, now).allowed);
    }

    #[test]
    fn test_prune_removes_expired() {
        let store = RateLimitStore::new();
        let now = Instant::now();
        store.hit_at("old", 5, WINDOW, now);
        store.hit_at("fresh", 5, WINDOW, now + Duration::from_secs(50));
        let removed = store.prune(WINDOW, now + Duration::from_secs(61));
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pruner_stops_on_shutdown() {
        let store = Arc::new(RateLimitStore::new());
        let settings = crate::config::shared(crate::config::GatewayConfig::default());
        let (tx, rx) = broadcast::channel(1);
        let handle = spawn_pruner(store, settings, rx);
        tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
