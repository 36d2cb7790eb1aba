// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traffic Coordinator Daemon (tcd)
//!
//! Background process that owns the signal coordinator and serves requests.

use std::path::PathBuf;
use std::sync::Arc;

use tc_daemon::lifecycle::{self, Config, LifecycleError};
use tc_daemon::{server, STARTUP_MARKER_PREFIX};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse arguments: tcd [--config PATH]
    let config_path = config_path_from_args(std::env::args().skip(1))
        .or_else(|| std::env::var_os("TC_CONFIG").map(PathBuf::from));

    let config = Config::load(config_path.as_deref())?;

    // Write startup marker to log (before tracing setup, so CLI can find it)
    write_startup_marker(&config)?;

    let log_guard = setup_logging(&config)?;

    info!("Starting tcd on {}", config.addr());

    let mut daemon = match lifecycle::startup(&config).await {
        Ok(d) => d,
        Err(e) => {
            // Write error synchronously (tracing is non-blocking and may not flush in time)
            write_startup_error(&config, &e);
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let local_addr = daemon.listener.local_addr()?;
    info!("Daemon ready, listening on {}", local_addr);

    // Signal ready for parent process (e.g., CLI waiting for startup)
    println!("READY {}", local_addr);

    let context = Arc::clone(&daemon.context);
    tokio::select! {
        _ = server::serve(&daemon.listener, Arc::clone(&context)) => {}

        _ = context.shutdown.notified() => {
            info!("Shutdown requested via IPC, shutting down...");
        }

        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down...");
        }

        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down...");
        }
    }

    daemon.shutdown().await?;
    info!("Daemon stopped");
    drop(log_guard);
    Ok(())
}

fn config_path_from_args(mut args: impl Iterator<Item = String>) -> Option<PathBuf> {
    while let Some(arg) = args.next() {
        if let Some(path) = arg.strip_prefix("--config=") {
            return Some(PathBuf::from(path));
        }
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}

/// Write startup marker to log file (appends to existing log)
fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    use std::io::Write;

    std::fs::create_dir_all(&config.state_dir)?;

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    writeln!(file, "{}{})", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Write startup error synchronously to log file.
/// This ensures the error is visible to the CLI even if the process exits quickly.
fn write_startup_error(config: &Config, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().ok_or(LifecycleError::NoStateDir)?,
        config
            .log_path
            .file_name()
            .ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(guard)
}
