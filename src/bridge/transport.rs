//! Outbound transport seam.
//!
//! # Responsibilities
//! - Execute one physical HTTP attempt against the upstream
//! - Classify transport failures into stable signature codes
//!
//! # Design Decisions
//! - The dispatcher only sees the `Transport` trait; tests script it
//! - Failures carry a signature code (`ECONNRESET`, `ETIMEDOUT`, ...) in their
//!   message so retry classification stays configurable by substring
//! - The production transport never retries by itself

use std::error::Error as StdError;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use thiserror::Error;

use crate::bridge::types::Method;
use crate::config::UpstreamConfig;

/// Coarse class of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connection refused, reset or closed mid-flight.
    ConnectionReset,
    Timeout,
    /// Host name did not resolve.
    DnsFailure,
    /// Request or body transfer failed after connecting.
    FetchFailed,
    /// The request could not be built (bad URL, bad header, redirect loop).
    InvalidRequest,
}

impl TransportErrorKind {
    pub fn signature(&self) -> &'static str {
        match self {
            TransportErrorKind::ConnectionReset => "ECONNRESET",
            TransportErrorKind::Timeout => "ETIMEDOUT",
            TransportErrorKind::DnsFailure => "ENOTFOUND",
            TransportErrorKind::FetchFailed => "FETCH_ERROR",
            TransportErrorKind::InvalidRequest => "EINVALID",
        }
    }
}

/// A failed attempt that produced no response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: {detail}", kind.signature())]
pub struct TransportError {
    kind: TransportErrorKind,
    detail: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// Classify a reqwest failure.
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        let detail = error_chain(err);
        let kind = if err.is_builder() || err.is_redirect() {
            TransportErrorKind::InvalidRequest
        } else if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            let lower = detail.to_ascii_lowercase();
            if lower.contains("dns error") || lower.contains("failed to lookup address") {
                TransportErrorKind::DnsFailure
            } else {
                TransportErrorKind::ConnectionReset
            }
        } else {
            TransportErrorKind::FetchFailed
        };
        Self { kind, detail }
    }
}

fn error_chain(err: &dyn StdError) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(inner) = source {
        parts.push(inner.to_string());
        source = inner.source();
    }
    parts.join(": ")
}

/// A fully built request for one attempt. Built once per dispatch.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

/// Status and body text of an upstream response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Executes a single physical attempt.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &OutboundRequest) -> Result<RawResponse, TransportError>;
}

/// Production transport backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build the client with per-attempt and connect timeouts.
    pub fn new(config: &UpstreamConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.attempt_timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .user_agent(concat!("bridge-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::from_reqwest(&e))?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<RawResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.into(), &request.url)
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&e))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(&e))?;

        Ok(RawResponse { status, body })
    }
}
