//! Request handlers.
//!
//! # Responsibilities
//! - Proxy matched gateway routes to the upstream through the dispatcher
//! - Serve health, upstream status and generated documentation
//!
//! # Data Flow
//! ```text
//! inbound (method, path, query, body, Idempotency-Key)
//!     → RouteTable::find (404 NOT_FOUND on miss)
//!     → JSON body (400 INVALID_JSON), raw query for list routes
//!     → BridgeClient::dispatch
//!     → envelope with upstream status (500 INTERNAL_ERROR on dispatch error)
//! ```

use std::collections::BTreeMap;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method as HttpMethod, StatusCode, Uri},
    response::Response,
};
use serde_json::{json, Value};

use crate::bridge::{DispatchOptions, Method};
use crate::http::response::{self, GatewayError};
use crate::http::server::AppState;
use crate::webhooks::EventCategory;

pub const SERVICE_NAME: &str = "bridge-api-gateway";
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Parse a request body as JSON. Empty bodies carry nothing.
pub fn parse_json_body(body: &[u8]) -> Result<Option<Value>, GatewayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| GatewayError::InvalidJson(e.to_string()))
}

/// Body to forward for a route. Body-carrying routes always send an object,
/// `{}` when the inbound body is empty.
pub fn request_payload(forwards_body: bool, body: &[u8]) -> Result<Option<Value>, GatewayError> {
    if !forwards_body {
        return Ok(None);
    }
    Ok(Some(parse_json_body(body)?.unwrap_or_else(|| json!({}))))
}

/// Fallback handler for every gateway route in the table.
pub async fn proxy_handler(
    State(state): State<AppState>,
    method: HttpMethod,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GatewayError> {
    let path = uri.path();
    let not_found = || GatewayError::NotFound {
        method: method.to_string(),
        path: path.to_string(),
    };

    let method = Method::try_from(&method).map_err(|_| not_found())?;
    let matched = state.routes.find(method, path).ok_or_else(not_found)?;
    let spec = matched.spec();

    let payload = request_payload(spec.forwards_body, &body)?;
    let target = matched.upstream_target(uri.query());

    let options = DispatchOptions {
        idempotency_key: headers
            .get(IDEMPOTENCY_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };

    tracing::debug!(method = %method, path, upstream = %target, group = spec.group, "Proxying request");
    let result = state.bridge.dispatch(method, &target, payload, options).await?;
    Ok(response::from_dispatch(result))
}

pub async fn health(State(state): State<AppState>) -> Response {
    let config = state.settings.load();
    response::success(
        StatusCode::OK,
        json!({
            "status": "healthy",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION"),
            "service": SERVICE_NAME,
            "environment": config.upstream.environment,
        }),
    )
}

/// Gateway status including a live upstream round trip.
pub async fn status(State(state): State<AppState>) -> Result<Response, GatewayError> {
    let started = Instant::now();
    let result = state
        .bridge
        .dispatch(Method::Get, "/customers?limit=1", None, DispatchOptions::default())
        .await
        .map_err(GatewayError::BridgeUnreachable)?;
    let elapsed_ms = started.elapsed().as_millis() as u64;
    let bridge_status = if result.ok { "connected" } else { "error" };

    let config = state.settings.load();
    let policy = state.bridge.retry_policy();
    Ok(response::success(
        StatusCode::OK,
        json!({
            "gateway": {
                "status": "healthy",
                "version": env!("CARGO_PKG_VERSION"),
                "timestamp": chrono::Utc::now().to_rfc3339(),
            },
            "bridge": {
                "status": bridge_status,
                "responseTime": format!("{elapsed_ms}ms"),
                "apiVersion": "v0",
                "attempts": result.attempts,
            },
            "configuration": {
                "bridgeUrl": state.bridge.base_url(),
                "environment": config.upstream.environment,
                "rateLimitEnabled": config.rate_limit.enabled,
                "rateLimitMax": config.rate_limit.max_requests,
                "rateLimitWindow": format!("{}ms", config.rate_limit.window_ms),
                "rateLimitType": "per-token",
                "authEnabled": config.auth.api_token.is_some() || config.auth.jwt_secret.is_some(),
            },
            "features": {
                "rateLimitByToken": true,
                "retryLogic": {
                    "enabled": policy.max_retries() > 0,
                    "maxRetries": policy.max_retries(),
                    "baseDelay": format!("{}ms", config.retries.base_delay_ms),
                    "maxDelay": format!("{}ms", config.retries.max_delay_ms),
                    "deadline": policy.deadline().map(|d| format!("{}ms", d.as_millis())),
                    "retryableStatuses": policy.retryable_statuses().collect::<Vec<_>>(),
                },
                "idempotencyKeys": true,
            },
        }),
    ))
}

/// Machine-readable documentation generated from the route table.
pub async fn docs(State(state): State<AppState>) -> Response {
    let config = state.settings.load();

    let mut endpoints: BTreeMap<&str, Vec<Value>> = BTreeMap::new();
    for spec in state.routes.specs() {
        endpoints.entry(spec.group).or_default().push(json!({
            "method": spec.method,
            "path": spec.gateway,
            "upstream": spec.upstream,
            "description": spec.description,
            "acceptsBody": spec.forwards_body,
            "acceptsQuery": spec.forwards_query,
        }));
    }

    let webhook_events: BTreeMap<&str, &[&str]> = EventCategory::ALL
        .iter()
        .map(|c| (c.as_str(), c.event_types()))
        .collect();

    response::success(
        StatusCode::OK,
        json!({
            "name": "Bridge API Gateway",
            "version": env!("CARGO_PKG_VERSION"),
            "environment": config.upstream.environment,
            "authentication": {
                "publicPaths": config.auth.public_paths,
                "methods": [
                    {"type": "fixed_token", "header": "x-api-token"},
                    {"type": "jwt", "header": "Authorization", "format": "Bearer <jwt>", "algorithm": "HS256"},
                ],
            },
            "rateLimit": {
                "enabled": config.rate_limit.enabled,
                "maxRequests": config.rate_limit.max_requests,
                "windowMs": config.rate_limit.window_ms,
                "keyedBy": ["token", "ip"],
                "headers": ["X-RateLimit-Limit", "X-RateLimit-Remaining", "X-RateLimit-Reset", "X-RateLimit-Type"],
            },
            "idempotency": {
                "header": "Idempotency-Key",
                "appliesTo": ["POST", "PUT", "PATCH"],
                "generatedWhenAbsent": true,
            },
            "monitoring": [
                {"method": "GET", "path": "/health", "description": "Gateway liveness"},
                {"method": "GET", "path": "/api/status", "description": "Gateway and upstream status"},
                {"method": "GET", "path": "/api/docs", "description": "This document"},
            ],
            "endpointCount": state.routes.len(),
            "endpoints": endpoints,
            "webhooks": {
                "endpoint": "/webhooks/bridge",
                "events": webhook_events,
            },
            "errorCodes": [
                {"code": 400, "name": "INVALID_JSON / INVALID_PAYLOAD"},
                {"code": 401, "name": "UNAUTHORIZED / INVALID_TOKEN"},
                {"code": 404, "name": "NOT_FOUND"},
                {"code": 408, "name": "REQUEST_TIMEOUT"},
                {"code": 429, "name": "RATE_LIMIT_EXCEEDED"},
                {"code": 500, "name": "INTERNAL_ERROR"},
                {"code": 503, "name": "BRIDGE_UNREACHABLE"},
            ],
        }),
    )
}
