//! Authentication middleware.
//!
//! # Responsibilities
//! - Let public paths through untouched
//! - Accept the fixed API token (`x-api-token`)
//! - Verify HS256 bearer JWTs and attach the principal to the request
//!
//! # Design Decisions
//! - Fail closed: with no token and no JWT secret configured, only public
//!   paths are reachable
//! - A bearer token that fails verification is `INVALID_TOKEN`, never a
//!   fallthrough to `UNAUTHORIZED`
//! - Tokens are compared in constant time, never logged

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::config::{AuthConfig, SharedConfig};
use crate::http::response::GatewayError;

pub const API_TOKEN_HEADER: &str = "x-api-token";

/// JWT claims issued to gateway users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: Value,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: u64,
}

/// Verified caller, stored in request extensions.
#[derive(Debug, Clone, PartialEq)]
pub enum Principal {
    FixedToken,
    Jwt(Claims),
}

impl Principal {
    pub fn auth_type(&self) -> &'static str {
        match self {
            Principal::FixedToken => "fixed_token",
            Principal::Jwt(_) => "jwt",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("no valid credentials presented")]
    MissingCredentials,
    #[error("bearer token rejected: {0}")]
    InvalidJwt(String),
}

impl From<AuthError> for GatewayError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => GatewayError::Unauthorized,
            AuthError::InvalidJwt(_) => GatewayError::InvalidToken,
        }
    }
}

pub fn is_public(config: &AuthConfig, path: &str) -> bool {
    config.public_paths.iter().any(|p| p == path)
}

/// Resolve the caller from request headers.
pub fn authenticate(config: &AuthConfig, headers: &HeaderMap) -> Result<Principal, AuthError> {
    if let (Some(expected), Some(presented)) = (
        config.api_token.as_deref().filter(|t| !t.is_empty()),
        headers.get(API_TOKEN_HEADER).and_then(|v| v.to_str().ok()),
    ) {
        if bool::from(presented.as_bytes().ct_eq(expected.as_bytes())) {
            return Ok(Principal::FixedToken);
        }
    }

    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match bearer {
        Some(token) => verify_jwt(config, token).map(Principal::Jwt),
        None => Err(AuthError::MissingCredentials),
    }
}

fn verify_jwt(config: &AuthConfig, token: &str) -> Result<Claims, AuthError> {
    let secret = config
        .jwt_secret
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AuthError::InvalidJwt("no JWT secret configured".into()))?;

    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| AuthError::InvalidJwt(e.to_string()))
}

pub async fn auth_middleware(
    State(settings): State<SharedConfig>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let config = settings.load();
    if is_public(&config.auth, request.uri().path()) {
        return next.run(request).await;
    }

    match authenticate(&config.auth, request.headers()) {
        Ok(principal) => {
            tracing::debug!(auth_type = principal.auth_type(), path = %request.uri().path(), "Request authenticated");
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(err) => {
            tracing::warn!(error = %err, path = %request.uri().path(), "Authentication failed");
            GatewayError::from(err).into_response()
        }
    }
}
