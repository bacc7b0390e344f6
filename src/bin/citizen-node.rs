#![forbid(unsafe_code)]
//! CitizenChain node: ledger, block scheduler and REST API

use clap::Parser;
use citizenchain::config::{load_config, DEFAULT_CONFIG_PATH};
use citizenchain::node::{shutdown_signal, Node};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Overrides network.api_port
    #[arg(long)]
    port: Option<u16>,
    /// Overrides block_production.interval_secs
    #[arg(long)]
    block_interval: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;
    if let Some(port) = cli.port {
        config.network.api_port = port;
    }
    if let Some(interval) = cli.block_interval {
        config.block_production.interval_secs = Some(interval);
    }
    config.validate()?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let node = Arc::new(Node::new(config));
    node.run(shutdown_signal()).await?;
    Ok(())
}
