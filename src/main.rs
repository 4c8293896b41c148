//! Bridge API gateway binary.
//!
//! ```text
//!   client ──▶ request id ─▶ CORS ─▶ trace ─▶ access log ─▶ rate limit ─▶ auth
//!                                                                          │
//!                       ┌──────────────────────────────────────────────────┘
//!                       ▼
//!                 route table ─▶ dispatcher ─▶ retry policy ─▶ upstream API
//!                       │             (backoff, jitter, deadline)
//!                       ▼
//!              /health /api/status /api/docs /webhooks/bridge
//! ```

use std::path::PathBuf;

use clap::Parser;

use bridge_gateway::config::loader;
use bridge_gateway::lifecycle::startup;

#[derive(Parser, Debug)]
#[command(name = "bridge-gateway", version, about = "Authenticated, retrying gateway for the Bridge API")]
struct Args {
    /// Path to a TOML config file; watched for changes when given
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.check {
        let config = loader::load(args.config.as_deref())?;
        println!(
            "Configuration OK: listening on {}, upstream {}",
            config.listener.bind_address, config.upstream.base_url
        );
        return Ok(());
    }

    startup::run(args.config.as_deref()).await?;
    Ok(())
}
