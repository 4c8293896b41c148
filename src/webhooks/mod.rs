//! Inbound webhook subsystem.
//!
//! # Data Flow
//! ```text
//! POST /webhooks/bridge (raw body)
//!     → handler.rs (parse, signature check, acknowledge)
//!     → events.rs (event type → EventCategory)
//!     → per-category structured log + metric
//! ```

pub mod events;
pub mod handler;

pub use events::EventCategory;
pub use handler::{process_event, webhook_handler};
