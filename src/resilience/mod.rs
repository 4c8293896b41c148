//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatch to upstream:
//!     → timeouts.rs (deadline for the whole logical call)
//!     → On failure: retries.rs (classify, decide whether attempts remain)
//!     → backoff.rs (jittered exponential delay before the next attempt)
//! ```
//!
//! # Design Decisions
//! - Retry state lives on the stack of one dispatch; nothing is shared
//! - Mutating requests are retried too, made safe by the idempotency key
//! - Jitter is symmetric (±25%) to desynchronize concurrent callers

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use retries::{AttemptOutcome, RetryPolicy};
pub use timeouts::{Deadline, DeadlineElapsed};
