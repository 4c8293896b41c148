//! Client SDK for the Bridge API gateway.
//!
//! ```no_run
//! # async fn demo() -> Result<(), bridge_gateway_sdk::SdkError> {
//! use bridge_gateway_sdk::GatewayClient;
//!
//! let client = GatewayClient::new("http://localhost:3000").with_token("my-token");
//! let customers = client.list_customers(&[("limit", "10")]).await?;
//! println!("{}", customers["data"]);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;

pub use client::GatewayClient;
pub use error::SdkError;
