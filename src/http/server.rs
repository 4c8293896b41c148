//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (request id, CORS, tracing, access log, rate limit, auth)
//! - Bind to a plain or TLS listener with graceful shutdown
//! - Apply hot-reloaded configuration
//!
//! # Design Decisions
//! - Live settings sit behind `ArcSwap`; middleware reads them per request
//! - Listener-level limits (body size, timeout, concurrency) are fixed at build
//! - Upstream base URL and API key changes need a restart

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    error_handling::HandleErrorLayer,
    extract::{DefaultBodyLimit, FromRef},
    http::HeaderName,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, MethodRouter},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::{limit::GlobalConcurrencyLimitLayer, timeout::TimeoutLayer, BoxError, ServiceBuilder};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::bridge::{BridgeClient, Transport, TransportError};
use crate::config::{shared, GatewayConfig, SharedConfig};
use crate::http::handlers::{docs, health, proxy_handler, status};
use crate::http::middleware::access_log;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, X_REQUEST_ID};
use crate::http::response::GatewayError;
use crate::resilience::RetryPolicy;
use crate::routing::RouteTable;
use crate::security::auth::auth_middleware;
use crate::security::rate_limit::{
    rate_limit_middleware, spawn_pruner, RateLimitState, RateLimitStore, X_RATELIMIT_LIMIT,
    X_RATELIMIT_REMAINING, X_RATELIMIT_RESET, X_RATELIMIT_TYPE,
};
use crate::webhooks::webhook_handler;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub settings: SharedConfig,
    pub bridge: BridgeClient,
    pub routes: Arc<RouteTable>,
    pub rate_limits: Arc<RateLimitStore>,
}

impl FromRef<AppState> for SharedConfig {
    fn from_ref(state: &AppState) -> Self {
        state.settings.clone()
    }
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    state: AppState,
    router: Router,
}

impl GatewayServer {
    /// Create a server that talks to the upstream over HTTP.
    pub fn new(config: GatewayConfig) -> Result<Self, TransportError> {
        let bridge = BridgeClient::from_config(&config)?;
        Ok(Self::with_bridge(config, bridge))
    }

    /// Create a server over a custom transport.
    pub fn with_transport(config: GatewayConfig, transport: Arc<dyn Transport>) -> Self {
        let bridge = BridgeClient::new(
            &config.upstream,
            RetryPolicy::from_config(&config.retries),
            transport,
        );
        Self::with_bridge(config, bridge)
    }

    fn with_bridge(config: GatewayConfig, bridge: BridgeClient) -> Self {
        let state = AppState {
            settings: shared(config.clone()),
            bridge,
            routes: Arc::new(RouteTable::default()),
            rate_limits: Arc::new(RateLimitStore::new()),
        };
        let router = Self::build_router(&config, state.clone());
        Self { state, router }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Layers are listed inner to outer. `Router::layer` applies each layer
    /// per route, so the concurrency cap uses one semaphore shared by all.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let rate_limit_state = RateLimitState {
            settings: state.settings.clone(),
            store: state.rate_limits.clone(),
        };

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers([
                HeaderName::from_static(X_REQUEST_ID),
                HeaderName::from_static(X_RATELIMIT_LIMIT),
                HeaderName::from_static(X_RATELIMIT_REMAINING),
                HeaderName::from_static(X_RATELIMIT_RESET),
                HeaderName::from_static(X_RATELIMIT_TYPE),
            ]);

        let request_secs = config.timeouts.request_secs;
        let timeout = ServiceBuilder::new()
            .layer(HandleErrorLayer::new(move |err: BoxError| async move {
                middleware_error(err, request_secs)
            }))
            .layer(TimeoutLayer::new(Duration::from_secs(request_secs)));

        Router::new()
            .route("/health", or_proxy(get(health)))
            .route("/api/status", or_proxy(get(status)))
            .route("/api/docs", or_proxy(get(docs)))
            .route("/webhooks/bridge", or_proxy(post(webhook_handler)))
            .fallback(proxy_handler)
            .layer(from_fn_with_state(state.settings.clone(), auth_middleware))
            .layer(from_fn_with_state(rate_limit_state, rate_limit_middleware))
            .with_state(state)
            .layer(from_fn(access_log))
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(timeout)
            .layer(GlobalConcurrencyLimitLayer::new(config.listener.max_connections))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// The fully layered router, for serving or in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Swap in a reloaded configuration.
    pub fn apply_config(&self, config: GatewayConfig) {
        apply_config(&self.state, config);
    }

    /// Run the server on a plain TCP listener until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: Option<mpsc::UnboundedReceiver<GatewayConfig>>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, routes = self.state.routes.len(), "HTTP server starting");

        let pruner = self.spawn_background(config_updates, &shutdown);
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(wait_for(shutdown))
            .await?;

        let _ = pruner.await;
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server with TLS termination until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        config_updates: Option<mpsc::UnboundedReceiver<GatewayConfig>>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %addr, routes = self.state.routes.len(), "HTTPS server starting");

        let pruner = self.spawn_background(config_updates, &shutdown);
        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            wait_for(shutdown).await;
            shutdown_handle.graceful_shutdown(Some(Duration::from_secs(30)));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service_with_connect_info::<SocketAddr>())
            .await?;

        let _ = pruner.await;
        tracing::info!("HTTPS server stopped");
        Ok(())
    }

    fn spawn_background(
        &self,
        config_updates: Option<mpsc::UnboundedReceiver<GatewayConfig>>,
        shutdown: &broadcast::Receiver<()>,
    ) -> tokio::task::JoinHandle<()> {
        if let Some(mut updates) = config_updates {
            let state = self.state.clone();
            tokio::spawn(async move {
                while let Some(config) = updates.recv().await {
                    apply_config(&state, config);
                }
            });
        }

        spawn_pruner(
            self.state.rate_limits.clone(),
            self.state.settings.clone(),
            shutdown.resubscribe(),
        )
    }
}

fn middleware_error(err: BoxError, request_secs: u64) -> GatewayError {
    if err.is::<tower::timeout::error::Elapsed>() {
        tracing::warn!(timeout_secs = request_secs, "Request timed out");
        GatewayError::Timeout { secs: request_secs }
    } else {
        tracing::error!(error = %err, "Unhandled middleware error");
        GatewayError::Internal
    }
}

fn or_proxy(router: MethodRouter<AppState>) -> MethodRouter<AppState> {
    router.fallback(proxy_handler)
}

fn apply_config(state: &AppState, config: GatewayConfig) {
    let current = state.settings.load();
    if current.upstream.base_url != config.upstream.base_url
        || current.upstream.api_key != config.upstream.api_key
    {
        tracing::warn!("Upstream URL or API key changed; restart required to apply");
    }
    if current.listener != config.listener || current.security != config.security {
        tracing::warn!("Listener or body limit settings changed; restart required to apply");
    }

    state.bridge.set_retry_policy(RetryPolicy::from_config(&config.retries));
    state.settings.store(Arc::new(config));
    tracing::info!("Configuration reloaded");
}

async fn wait_for(mut shutdown: broadcast::Receiver<()>) {
    let _ = shutdown.recv().await;
    tracing::info!("Shutdown signal received");
}
