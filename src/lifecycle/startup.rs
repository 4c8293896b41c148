//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize logging and metrics
//! - Start background tasks (signals, config watcher)
//! - Bind listeners and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when ready)

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::bridge::TransportError;
use crate::config::loader::{self, ConfigError};
use crate::config::watcher::ConfigWatcher;
use crate::config::GatewayConfig;
use crate::http::GatewayServer;
use crate::lifecycle::signals::spawn_signal_handler;
use crate::lifecycle::Shutdown;
use crate::net::load_tls_config;
use crate::observability::{logging, metrics};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to initialize logging: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("invalid {field} address: {value}")]
    Address { field: &'static str, value: String },

    #[error("failed to build upstream client: {0}")]
    Transport(#[from] TransportError),

    #[error("failed to watch config file: {0}")]
    Watcher(#[from] notify::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn parse_addr(field: &'static str, value: &str) -> Result<SocketAddr, StartupError> {
    value.parse().map_err(|_| StartupError::Address {
        field,
        value: value.to_string(),
    })
}

/// Run the gateway until a shutdown signal arrives.
pub async fn run(config_path: Option<&Path>) -> Result<(), StartupError> {
    let config = loader::load(config_path)?;
    logging::init_logging(&config.observability)?;
    log_config(&config);

    if config.observability.metrics_enabled {
        let addr = parse_addr("metrics", &config.observability.metrics_address)?;
        metrics::init_metrics(addr)?;
    }

    let shutdown = Arc::new(Shutdown::new());
    let server_shutdown = shutdown.subscribe();
    spawn_signal_handler(shutdown.clone());

    let (_watcher, updates) = match config_path {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), Some(updates))
        }
        None => (None, None),
    };

    let server = GatewayServer::new(config.clone())?;
    match &config.listener.tls {
        Some(tls) => {
            let rustls = load_tls_config(tls).await?;
            let addr = parse_addr("listener", &config.listener.bind_address)?;
            server.run_tls(addr, rustls, updates, server_shutdown).await?;
        }
        None => {
            let listener = TcpListener::bind(&config.listener.bind_address).await?;
            server.run(listener, updates, server_shutdown).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

fn log_config(config: &GatewayConfig) {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        upstream = %config.upstream.base_url,
        environment = %config.upstream.environment,
        max_retries = config.retries.max_retries,
        deadline_ms = config.retries.deadline_ms,
        rate_limit_enabled = config.rate_limit.enabled,
        rate_limit_max = config.rate_limit.max_requests,
        "Configuration loaded"
    );
    if config.upstream.api_key.is_empty() {
        tracing::warn!("Upstream API key is not set; upstream calls will be rejected");
    }
    if config.auth.api_token.is_none() && config.auth.jwt_secret.is_none() {
        tracing::warn!("No API token or JWT secret configured; only public paths are reachable");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_addr() {
        assert!(parse_addr("listener", "127.0.0.1:3000").is_ok());
        let err = parse_addr("metrics", "nowhere").unwrap_err();
        assert_eq!(err.to_string(), "invalid metrics address: nowhere");
    }
}
