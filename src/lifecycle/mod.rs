//! Process lifecycle.
//!
//! # Data Flow
//! ```text
//! startup.rs:
//!     load + validate config → logging → metrics exporter
//!     → signal handler, config watcher → GatewayServer → listener (plain or TLS)
//!
//! signals.rs → shutdown.rs:
//!     SIGINT/SIGTERM → Shutdown::trigger → broadcast
//!     → server stops accepting and drains, rate-limit pruner exits
//! ```
//!
//! # Design Decisions
//! - Any startup failure is returned as a `StartupError` and ends the process
//! - Config reload comes from the file watcher, not SIGHUP

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::StartupError;
