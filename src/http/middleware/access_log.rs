//! Access logging.
//!
//! One structured event per inbound request, emitted after the response is
//! produced, plus request count and latency metrics.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Request},
    middleware::Next,
    response::Response,
};

use crate::http::request::RequestIdExt;
use crate::observability::metrics;

pub async fn access_log(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let request_id = request.request_id().to_string();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());

    let response = next.run(request).await;
    let status = response.status().as_u16();

    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        client_ip = client_ip.as_deref().unwrap_or("unknown"),
        status,
        elapsed_ms = start.elapsed().as_millis() as u64,
        user_agent = user_agent.as_deref().unwrap_or("-"),
        "Request completed"
    );
    metrics::record_request(&method, status, start);
    response
}
