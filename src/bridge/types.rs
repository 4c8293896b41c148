//! Dispatch types and error definitions.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::bridge::transport::TransportError;

/// HTTP methods the upstream accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// POST, PUT and PATCH carry a body and an idempotency key.
    pub const fn is_mutating(&self) -> bool {
        matches!(self, Method::Post | Method::Put | Method::Patch)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for methods outside GET/POST/PUT/PATCH/DELETE.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported method: {0}")]
pub struct UnsupportedMethod(pub String);

impl FromStr for Method {
    type Err = UnsupportedMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            _ => Err(UnsupportedMethod(s.to_string())),
        }
    }
}

impl TryFrom<&axum::http::Method> for Method {
    type Error = UnsupportedMethod;

    fn try_from(method: &axum::http::Method) -> Result<Self, Self::Error> {
        method.as_str().parse()
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    /// Caller-supplied idempotency key; one is generated when absent.
    pub idempotency_key: Option<String>,
}

impl DispatchOptions {
    pub fn with_idempotency_key(key: impl Into<String>) -> Self {
        Self {
            idempotency_key: Some(key.into()),
        }
    }
}

/// One logical outbound call.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub method: Method,
    /// Upstream-relative path, including any query string.
    pub path: String,
    pub body: Option<Value>,
    pub options: DispatchOptions,
}

impl DispatchRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            options: DispatchOptions::default(),
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.options.idempotency_key = Some(key.into());
        self
    }
}

/// Outcome of a dispatch that received a response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchResult {
    pub status: u16,
    /// `status` is in 200..=299.
    pub ok: bool,
    /// Parsed JSON body, or `{"raw": <text>}` when the body is not JSON.
    pub data: Value,
    /// Physical attempts made, at least 1.
    pub attempts: u32,
}

impl DispatchResult {
    pub fn new(status: u16, body: &str, attempts: u32) -> Self {
        Self {
            status,
            ok: (200..=299).contains(&status),
            data: parse_body(body),
            attempts,
        }
    }
}

/// Parse a response body as JSON, falling back to `{"raw": text}`.
pub fn parse_body(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| json!({ "raw": text }))
}

/// Errors that escape a dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No response was ever received: the last transport failure.
    #[error("upstream request failed after {attempts} attempt(s): {source}")]
    Transport {
        #[source]
        source: TransportError,
        attempts: u32,
    },

    /// The total dispatch budget ran out before any response arrived.
    #[error("upstream dispatch exceeded its {budget_ms}ms deadline after {attempts} attempt(s)")]
    DeadlineExceeded { budget_ms: u64, attempts: u32 },
}

impl DispatchError {
    pub fn attempts(&self) -> u32 {
        match self {
            DispatchError::Transport { attempts, .. } => *attempts,
            DispatchError::DeadlineExceeded { attempts, .. } => *attempts,
        }
    }
}
