//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + environment
//!     → loader.rs (parse, deserialize, env overrides)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of Arc<GatewayConfig>
//!     → new requests and dispatches observe new config
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Secrets come from the environment, never logged

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

use std::sync::Arc;

use arc_swap::ArcSwap;

pub use loader::ConfigError;
pub use schema::{
    AuthConfig, GatewayConfig, ListenerConfig, LogFormat, ObservabilityConfig, RateLimitConfig,
    RetryConfig, SecurityConfig, TimeoutConfig, TlsConfig, UpstreamConfig, WebhookConfig,
};

/// Live configuration shared by the server and middleware; swapped on reload.
pub type SharedConfig = Arc<ArcSwap<GatewayConfig>>;

pub fn shared(config: GatewayConfig) -> SharedConfig {
    Arc::new(ArcSwap::from_pointee(config))
}
