//! Response envelope and HTTP-facing errors.
//!
//! # Responsibilities
//! - Render dispatch results as `{success, data}` / `{success, error}`
//! - Map gateway errors to status codes and stable error codes
//!
//! # Design Decisions
//! - Upstream status codes pass through unchanged
//! - Upstream error bodies are forwarded verbatim under `error`
//! - Every gateway-originated failure carries `{code, message}`

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;

use crate::bridge::{DispatchError, DispatchResult};

/// Wrap a successful payload.
pub fn success(status: StatusCode, data: Value) -> Response {
    (status, Json(json!({ "success": true, "data": data }))).into_response()
}

/// Render an upstream result with its original status.
pub fn from_dispatch(result: DispatchResult) -> Response {
    let status = StatusCode::from_u16(result.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let body = if result.ok {
        json!({ "success": true, "data": result.data })
    } else {
        json!({ "success": false, "error": result.data })
    };
    (status, Json(body)).into_response()
}

/// Errors produced by the gateway itself.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Route {method} {path} not found")]
    NotFound { method: String, path: String },

    #[error("Request body is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Authentication required. Use x-api-token or Authorization: Bearer <jwt>")]
    Unauthorized,

    #[error("Invalid or expired JWT")]
    InvalidToken,

    #[error("Limit of {limit} requests per window exceeded. Try again in {reset_in} seconds.")]
    RateLimited { limit: u32, reset_in: u64 },

    #[error("Could not parse the webhook payload")]
    InvalidPayload,

    #[error("Request did not complete within {secs} seconds")]
    Timeout { secs: u64 },

    #[error("Could not reach the upstream API")]
    BridgeUnreachable(#[source] DispatchError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("Internal server error")]
    Internal,
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::NotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::InvalidJson(_) | GatewayError::InvalidPayload => StatusCode::BAD_REQUEST,
            GatewayError::Unauthorized | GatewayError::InvalidToken => StatusCode::UNAUTHORIZED,
            GatewayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Timeout { .. } => StatusCode::REQUEST_TIMEOUT,
            GatewayError::BridgeUnreachable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Dispatch(_) | GatewayError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::NotFound { .. } => "NOT_FOUND",
            GatewayError::InvalidJson(_) => "INVALID_JSON",
            GatewayError::Unauthorized => "UNAUTHORIZED",
            GatewayError::InvalidToken => "INVALID_TOKEN",
            GatewayError::RateLimited { .. } => "RATE_LIMIT_EXCEEDED",
            GatewayError::InvalidPayload => "INVALID_PAYLOAD",
            GatewayError::Timeout { .. } => "REQUEST_TIMEOUT",
            GatewayError::BridgeUnreachable(_) => "BRIDGE_UNREACHABLE",
            GatewayError::Dispatch(_) | GatewayError::Internal => "INTERNAL_ERROR",
        }
    }

    fn error_body(&self) -> Value {
        let mut error = json!({ "code": self.code(), "message": self.to_string() });
        match self {
            GatewayError::RateLimited { reset_in, .. } => {
                error["resetIn"] = json!(reset_in);
            }
            GatewayError::BridgeUnreachable(source) => {
                error["details"] = json!(source.to_string());
            }
            _ => {}
        }
        error
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let mut response = (
            self.status(),
            Json(json!({ "success": false, "error": self.error_body() })),
        )
            .into_response();

        if let GatewayError::RateLimited { reset_in, .. } = &self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(*reset_in));
        }
        response
    }
}
