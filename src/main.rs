mod bspc;
mod codec;
mod config;
mod daemon;
mod dispatcher;
mod handlers;
mod protocol;
mod socket_client;
mod socket_server;
mod state;

use anyhow::{Context, Result};
use config::{Command, Config};
use daemon::Daemon;
use tracing::info;

fn main() -> Result<()> {
    // Parse CLI arguments
    let config = Config::parse();

    // Initialize logging
    let log_level = if config.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    match config.command() {
        Command::Daemon => {
            info!("Starting bspwm-scratchpad daemon");

            let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
            rt.block_on(Daemon::new(config)?.run())
        }
        command => socket_client::run_command(&config, command),
    }
}
