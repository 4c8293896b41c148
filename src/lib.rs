//! Bridge API gateway library.
//!
//! An authenticated, rate-limited HTTP gateway in front of a financial
//! services API. Gateway routes are translated to upstream paths and sent
//! through a dispatcher that retries transient failures with jittered
//! exponential backoff and a stable idempotency key per logical call.

// Core subsystems
pub mod bridge;
pub mod config;
pub mod http;
pub mod net;
pub mod routing;

// Inbound events
pub mod webhooks;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;

pub use bridge::{BridgeClient, DispatchError, DispatchOptions, DispatchResult, Method};
pub use config::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
pub use resilience::RetryPolicy;
