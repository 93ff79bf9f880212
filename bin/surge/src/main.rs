#![doc = include_str!("../README.md")]
//! Surge: a JSON-RPC load generator for EVM chains.

use clap::Parser;
use eyre::Result;
use surge_cli::{Backtracing, Logging};
use surge_config::Config;
use surge_runner::Runner;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod cli;
use cli::Cli;

fn main() -> Result<()> {
    Backtracing::enable();

    let cli = Cli::parse();
    Logging::new(cli.verbose).init();
    let config = cli.load_config()?;

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(run(config))
}

async fn run(config: Config) -> Result<()> {
    let runner = Runner::new(config)?;
    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Interrupt received, stopping workers");
                    shutdown.cancel();
                }
                Err(err) => warn!(error = %err, "Failed to listen for interrupts"),
            }
        }
    });

    let outcome = runner.run(shutdown).await?;
    info!(
        requests = outcome.requests,
        start_block = outcome.start_block,
        end_block = outcome.end_block,
        "Load test finished"
    );
    Ok(())
}
