//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, latency, upstream attempts, rate limiting)
//! - Expose a Prometheus-compatible scrape endpoint
//!
//! # Metrics
//! - `gateway_requests_total` (counter): inbound requests by method, status
//! - `gateway_request_duration_seconds` (histogram): inbound latency
//! - `gateway_upstream_attempts_total` (counter): physical attempts by outcome
//! - `gateway_dispatch_total` (counter): logical dispatches by method, status
//! - `gateway_dispatch_attempts` (histogram): attempts per dispatch
//! - `gateway_dispatch_duration_seconds` (histogram): dispatch latency
//! - `gateway_rate_limited_total` (counter): rejected requests by key type
//! - `gateway_webhook_events_total` (counter): webhook events by category
//!
//! # Design Decisions
//! - Recording without an installed recorder is a no-op, so tests need no setup
//! - Status labels are stringified codes; `error` when no response arrived

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
    ];
    counter!("gateway_requests_total", &labels).increment(1);
    histogram!("gateway_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_attempt(method: &str, outcome: &'static str) {
    counter!(
        "gateway_upstream_attempts_total",
        "method" => method.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_dispatch(method: &str, status: Option<u16>, attempts: u32, start: Instant) {
    let status = status.map_or_else(|| "error".to_string(), |s| s.to_string());
    counter!(
        "gateway_dispatch_total",
        "method" => method.to_string(),
        "status" => status
    )
    .increment(1);
    histogram!("gateway_dispatch_attempts", "method" => method.to_string()).record(attempts as f64);
    histogram!("gateway_dispatch_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited(key_type: &'static str) {
    counter!("gateway_rate_limited_total", "type" => key_type).increment(1);
}

pub fn record_webhook_event(category: &'static str) {
    counter!("gateway_webhook_events_total", "category" => category).increment(1);
}
