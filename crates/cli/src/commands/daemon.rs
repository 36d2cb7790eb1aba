// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon management: start, stop, status, logs

use std::path::PathBuf;

use anyhow::Result;
use tc_daemon::Config;

use crate::client::{daemon_stop, start_daemon_background, ClientError, DaemonClient};
use crate::output::{self, OutputFormat};

#[derive(clap::Args)]
pub struct DaemonArgs {
    /// Daemon config file (also passed to tcd on start)
    #[arg(long, env = "TC_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(clap::Subcommand)]
pub enum DaemonCommand {
    /// Start the daemon in the background
    Start,
    /// Stop the daemon (graceful, then forceful)
    Stop,
    /// Show whether the daemon is running
    Status,
    /// Print the tail of the daemon log
    Logs {
        /// Number of lines to show
        #[arg(short = 'n', long, default_value_t = 50)]
        lines: usize,
    },
}

pub async fn handle(args: DaemonArgs, addr: Option<String>, format: OutputFormat) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;
    let target = addr.clone().unwrap_or_else(|| config.addr());
    let client = DaemonClient::new(target.clone());

    match args.command {
        DaemonCommand::Start => {
            match client.hello().await {
                Ok(version) => {
                    println!("Daemon already running on {} (version {})", target, version);
                    return Ok(());
                }
                Err(ClientError::DaemonNotRunning) => {}
                Err(e) => return Err(e.into()),
            }
            let child = start_daemon_background(args.config.as_deref(), addr.as_deref())?;
            client.wait_until_ready(child, &config.log_path).await?;
            println!("Daemon started on {}", target);
        }

        DaemonCommand::Stop => {
            if daemon_stop(&client, &config.pid_path).await? {
                println!("Daemon stopped");
            } else {
                println!("Daemon not running");
            }
        }

        DaemonCommand::Status => match client.info().await {
            Ok(info) => match format {
                OutputFormat::Text => {
                    println!("Status: running");
                    println!("Address: {}", target);
                    println!("Version: {}", info.version);
                    println!("Uptime: {}", format_uptime(info.uptime_secs));
                    println!("Replicas: {}", info.replica_count);
                }
                OutputFormat::Json => output::print_json(&info),
            },
            Err(ClientError::DaemonNotRunning) => match format {
                OutputFormat::Text => println!("Daemon not running"),
                OutputFormat::Json => output::print_json(&serde_json::json!({ "running": false })),
            },
            Err(e) => return Err(e.into()),
        },

        DaemonCommand::Logs { lines } => match std::fs::read_to_string(&config.log_path) {
            Ok(content) => {
                let all: Vec<&str> = content.lines().collect();
                for line in &all[all.len().saturating_sub(lines)..] {
                    println!("{}", line);
                }
            }
            Err(_) => println!("No log file at {}", config.log_path.display()),
        },
    }

    Ok(())
}

fn format_uptime(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    match (h, m) {
        (0, 0) => format!("{}s", s),
        (0, _) => format!("{}m {}s", m, s),
        _ => format!("{}h {}m {}s", h, m, s),
    }
}

#[cfg(test)]
mod tests {
    use super::format_uptime;

    #[test]
    fn uptime_formatting() {
        assert_eq!(format_uptime(7), "7s");
        assert_eq!(format_uptime(125), "2m 5s");
        assert_eq!(format_uptime(3_725), "1h 2m 5s");
    }
}
