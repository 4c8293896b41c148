//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use crate::config::schema::{GatewayConfig, LogFormat};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML config file without validating it.
pub fn read_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load from an optional file, apply environment overrides, then validate.
pub fn load(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_config(path)?,
        None => GatewayConfig::default(),
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay secrets and deployment knobs from the environment.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(key) = var("BRIDGE_API_KEY") {
        config.upstream.api_key = key;
    }
    if let Some(url) = var("BRIDGE_API_URL") {
        config.upstream.base_url = url;
    }
    if let Some(token) = var("GATEWAY_API_TOKEN") {
        config.auth.api_token = Some(token);
    }
    if let Some(secret) = var("JWT_SECRET") {
        config.auth.jwt_secret = Some(secret);
    }
    if let Some(secret) = var("WEBHOOK_SECRET") {
        config.webhooks.secret = Some(secret);
    }
    if let Some(raw) = var("RATE_LIMIT_MAX") {
        match raw.parse() {
            Ok(max) => config.rate_limit.max_requests = max,
            Err(_) => tracing::warn!(value = %raw, "Ignoring unparsable RATE_LIMIT_MAX"),
        }
    }
    if let Some(raw) = var("RATE_LIMIT_WINDOW_MS") {
        match raw.parse() {
            Ok(window) => config.rate_limit.window_ms = window,
            Err(_) => tracing::warn!(value = %raw, "Ignoring unparsable RATE_LIMIT_WINDOW_MS"),
        }
    }
    if let Some(raw) = var("PORT") {
        match raw.parse::<u16>() {
            Ok(port) => config.listener.bind_address = format!("0.0.0.0:{port}"),
            Err(_) => tracing::warn!(value = %raw, "Ignoring unparsable PORT"),
        }
    }
    if let Some(raw) = var("LOG_FORMAT") {
        match raw.to_ascii_lowercase().as_str() {
            "json" => config.observability.log_format = LogFormat::Json,
            "pretty" => config.observability.log_format = LogFormat::Pretty,
            other => tracing::warn!(value = %other, "Ignoring unknown LOG_FORMAT"),
        }
    }
}
