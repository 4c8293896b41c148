//! Gateway-specific middleware.

pub mod access_log;

pub use access_log::access_log;
