//! Upstream dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! route handler (method, path, body?, idempotency key?)
//!     → client.rs (build request once, attempt loop)
//!     → transport.rs (one physical HTTP attempt)
//!     → resilience (classify, back off, deadline)
//!     → DispatchResult {status, ok, data, attempts} | DispatchError
//! ```

pub mod client;
pub mod transport;
pub mod types;

pub use client::BridgeClient;
pub use transport::{HttpTransport, OutboundRequest, RawResponse, Transport, TransportError, TransportErrorKind};
pub use types::{DispatchError, DispatchOptions, DispatchRequest, DispatchResult, Method};
