// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! tc - Traffic Coordinator CLI

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{daemon, deadlock, signal};

use crate::client::{DaemonClient, DEFAULT_ADDR};
use crate::output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "tc",
    version,
    about = "Traffic Coordinator - signal groups, crossings and their locks"
)]
struct Cli {
    /// Daemon address (host:port)
    #[arg(long, global = true, env = "TC_ADDR")]
    addr: Option<String>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Daemon management
    Daemon(daemon::DaemonArgs),
    /// Show signals, crossings, locks and replicas
    Status,
    /// Set auto mode and/or switch a group to GREEN
    Manual(signal::ManualArgs),
    /// Run one automatic cycle (only while auto mode is on)
    Cycle(signal::CycleArgs),
    /// Set the crossings for a GREEN group
    Pedestrian(signal::PedestrianArgs),
    /// Start the opposite-order lock demo (blocks the coordinator for good)
    Deadlock,
    /// Show recent committed transitions
    History,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging();

    // Handle daemon command separately (it resolves its own address)
    if let Commands::Daemon(args) = cli.command {
        return daemon::handle(args, cli.addr, cli.format).await;
    }

    let client = DaemonClient::new(cli.addr.unwrap_or_else(|| DEFAULT_ADDR.to_string()));
    tracing::debug!(addr = client.addr(), "connecting");

    match cli.command {
        Commands::Status => signal::status(&client, cli.format).await?,
        Commands::Manual(args) => signal::manual(&client, args, cli.format).await?,
        Commands::Cycle(args) => signal::cycle(&client, args, cli.format).await?,
        Commands::Pedestrian(args) => signal::pedestrian(&client, args, cli.format).await?,
        Commands::Deadlock => deadlock::trigger(&client, cli.format).await?,
        Commands::History => signal::history(&client, cli.format).await?,
        Commands::Daemon(_) => unreachable!(),
    }

    Ok(())
}

fn setup_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
