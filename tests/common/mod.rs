//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    Router,
};
use bridge_gateway::config::GatewayConfig;
use bridge_gateway::http::GatewayServer;
use bridge_gateway::lifecycle::Shutdown;
use bridge_gateway_sdk::GatewayClient;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const TEST_TOKEN: &str = "test-token";
pub const TEST_API_KEY: &str = "test-upstream-key";

/// A request as the mock upstream saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    /// Path plus query string.
    pub target: String,
    pub headers: HeaderMap,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Default)]
struct Inner {
    script: VecDeque<(u16, String)>,
    fallback: Option<(u16, String)>,
    requests: Vec<RecordedRequest>,
}

/// Programmable upstream: answers from a script, then from a fallback.
#[derive(Clone)]
pub struct MockUpstream {
    pub addr: SocketAddr,
    inner: Arc<Mutex<Inner>>,
    task: Arc<JoinHandle<()>>,
}

async fn upstream_handler(
    State(inner): State<Arc<Mutex<Inner>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let mut inner = inner.lock().unwrap();
    inner.requests.push(RecordedRequest {
        method,
        target: uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string()),
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    });

    let (status, body) = inner
        .script
        .pop_front()
        .or_else(|| inner.fallback.clone())
        .unwrap_or((200, r#"{"ok":true}"#.to_string()));
    (StatusCode::from_u16(status).unwrap(), body)
}

impl MockUpstream {
    pub async fn start() -> Self {
        let inner = Arc::new(Mutex::new(Inner::default()));
        let app = Router::new()
            .fallback(upstream_handler)
            .with_state(inner.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            inner,
            task: Arc::new(task),
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Queue one response.
    pub fn push(&self, status: u16, body: &str) {
        self.inner.lock().unwrap().script.push_back((status, body.to_string()));
    }

    /// Response used once the script is exhausted.
    pub fn always(&self, status: u16, body: &str) {
        self.inner.lock().unwrap().fallback = Some((status, body.to_string()));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.lock().unwrap().requests.clone()
    }

    pub fn hits(&self) -> usize {
        self.inner.lock().unwrap().requests.len()
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        if Arc::strong_count(&self.task) == 1 {
            self.task.abort();
        }
    }
}

/// Config pointing at `upstream_url` with instant retries and a known token.
pub fn test_config(upstream_url: &str) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.upstream.base_url = upstream_url.to_string();
    config.upstream.api_key = TEST_API_KEY.into();
    config.upstream.attempt_timeout_ms = 2_000;
    config.retries.base_delay_ms = 0;
    config.retries.max_delay_ms = 0;
    config.auth.api_token = Some(TEST_TOKEN.into());
    config.auth.jwt_secret = Some("test-jwt-secret".into());
    config.rate_limit.max_requests = 1_000;
    config.observability.metrics_enabled = false;
    config
}

/// A gateway running on an ephemeral port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub task: JoinHandle<Result<(), std::io::Error>>,
}

impl TestGateway {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn sdk(&self) -> GatewayClient {
        GatewayClient::new(&self.url()).with_token(TEST_TOKEN)
    }
}

pub async fn spawn_gateway(config: GatewayConfig) -> TestGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = GatewayServer::new(config).unwrap();
    let shutdown = Shutdown::new();
    let task = tokio::spawn(server.run(listener, None, shutdown.subscribe()));
    TestGateway {
        addr,
        shutdown,
        task,
    }
}

/// Port with nothing listening.
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}
