//! Binary crate for the `weather-mcp` server.
//!
//! This crate focuses on:
//! - Loading configuration and failing fast without an API key
//! - Serving the weather tools over MCP on stdio
//! - Small operator commands (configure, list tools, one-shot calls)

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    // stdout belongs to the stdio transport
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cmd = cli::Cli::parse();
    cmd.run().await
}
