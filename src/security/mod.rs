//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-token / per-IP fixed window)
//!     → auth.rs (public path, fixed token or JWT)
//!     → Pass to handlers
//! ```
//!
//! # Design Decisions
//! - Rate limiting runs before auth so rejected credentials still count
//! - Fail closed: reject on any authentication failure
//! - No trust in client input

pub mod auth;
pub mod rate_limit;

pub use auth::{auth_middleware, AuthError, Claims, Principal};
pub use rate_limit::{rate_limit_middleware, RateLimitState, RateLimitStore};
