//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! access_log middleware, dispatcher, rate limiter, webhook receiver
//!     → logging.rs (tracing subscriber: EnvFilter + JSON or pretty output)
//!     → metrics.rs (gateway_* counters and histograms)
//!
//! Exported to:
//!     → stdout, one JSON object per event in production
//!     → Prometheus exporter on observability.metrics_address
//! ```
//!
//! # Design Decisions
//! - Upstream attempts and logical dispatches are counted separately
//! - The request id from `x-request-id` is the join key between log lines

pub mod logging;
pub mod metrics;
