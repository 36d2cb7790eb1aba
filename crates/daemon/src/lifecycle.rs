// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: configuration, startup, shutdown.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fs2::FileExt;
use serde::Deserialize;
use tc_core::{ConfigError, Coordinator, CoordinatorConfig};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::server::ServerContext;

/// Default listen address
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Default listen port
pub const DEFAULT_PORT: u16 = 3000;

/// On-disk configuration; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    bind: Option<String>,
    port: Option<u16>,
    state_dir: Option<PathBuf>,
    coordinator: CoordinatorConfig,
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to listen on
    pub bind: String,
    /// Port to listen on (0 picks a free port)
    pub port: u16,
    /// Directory for the PID, version and log files
    pub state_dir: PathBuf,
    /// Path to lock/PID file
    pub pid_path: PathBuf,
    /// Path to version file
    pub version_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Coordinator timing and sizing
    pub coordinator: CoordinatorConfig,
}

impl Config {
    /// Load configuration from an optional TOML file and the environment
    ///
    /// Precedence, lowest first: defaults, file, `TC_BIND` / `TC_PORT`.
    pub fn load(path: Option<&Path>) -> Result<Self, LifecycleError> {
        let file = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .map_err(|e| LifecycleError::ConfigRead(path.to_path_buf(), e))?;
                parse_config_file(&content)?
            }
            None => ConfigFile::default(),
        };
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Parse a TOML config with an explicit environment lookup
    pub fn from_toml(
        content: &str,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, LifecycleError> {
        Self::resolve(parse_config_file(content)?, env)
    }

    /// Defaults rooted at `state_dir`
    pub fn for_state_dir(state_dir: PathBuf) -> Self {
        Self::with_paths(
            DEFAULT_BIND.to_string(),
            DEFAULT_PORT,
            state_dir,
            CoordinatorConfig::default(),
        )
    }

    /// Address string suitable for `TcpListener::bind`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    fn resolve(
        file: ConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, LifecycleError> {
        let bind = env("TC_BIND")
            .or(file.bind)
            .unwrap_or_else(|| DEFAULT_BIND.to_string());

        let port = match env("TC_PORT") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| LifecycleError::InvalidEnv("TC_PORT", value))?,
            None => file.port.unwrap_or(DEFAULT_PORT),
        };

        let state_dir = match file.state_dir {
            Some(dir) => dir,
            None => state_dir(&env)?,
        };

        file.coordinator.validate()?;
        Ok(Self::with_paths(bind, port, state_dir, file.coordinator))
    }

    fn with_paths(
        bind: String,
        port: u16,
        state_dir: PathBuf,
        coordinator: CoordinatorConfig,
    ) -> Self {
        Self {
            bind,
            port,
            pid_path: state_dir.join("tcd.pid"),
            version_path: state_dir.join("tcd.version"),
            log_path: state_dir.join("tcd.log"),
            state_dir,
            coordinator,
        }
    }
}

fn parse_config_file(content: &str) -> Result<ConfigFile, LifecycleError> {
    Ok(toml::from_str(content)?)
}

/// Get the state directory for tc
///
/// `TC_STATE_DIR` wins, then `XDG_STATE_HOME/tc`, then `~/.local/state/tc`.
pub fn state_dir(env: impl Fn(&str) -> Option<String>) -> Result<PathBuf, LifecycleError> {
    if let Some(dir) = env("TC_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Some(xdg) = env("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("tc"));
    }
    let home = env("HOME").ok_or(LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/tc"))
}

/// Daemon state during operation
pub struct DaemonState {
    /// Configuration
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// TCP listener
    pub listener: TcpListener,
    /// Shared with every connection task
    pub context: Arc<ServerContext>,
}

impl DaemonState {
    /// Shutdown the daemon gracefully
    ///
    /// Auto mode is switched off so no new cycle starts. A cycle already in
    /// flight, or a demo deadlock, is abandoned when the process exits.
    pub async fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        self.context.coordinator.shutdown();

        if self.config.pid_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.pid_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        if self.config.version_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.version_path) {
                warn!("Failed to remove version file: {}", e);
            }
        }

        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to read config file {0}: {1}")]
    ConfigRead(PathBuf, std::io::Error),

    #[error("Invalid config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid value for {0}: {1:?}")]
    InvalidEnv(&'static str, String),

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind {0}: {1}")]
    BindFailed(String, std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<DaemonState, LifecycleError> {
    match startup_inner(config).await {
        Ok(state) => Ok(state),
        Err(LifecycleError::LockFailed(e)) => {
            // Another daemon owns these files; leave them alone
            Err(LifecycleError::LockFailed(e))
        }
        Err(e) => {
            cleanup_on_failure(config);
            Err(e)
        }
    }
}

/// Inner startup logic - cleanup_on_failure called if this fails
async fn startup_inner(config: &Config) -> Result<DaemonState, LifecycleError> {
    // 1. Create state directory
    std::fs::create_dir_all(&config.state_dir)?;

    // 2. Acquire lock file FIRST - prevents races. Opened without truncation
    //    so a running daemon's PID survives a failed second start.
    let mut lock_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&config.pid_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    use std::io::Write;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    std::fs::write(&config.version_path, env!("CARGO_PKG_VERSION"))?;

    // 3. Build the coordinator BEFORE binding (fail fast on bad config)
    let coordinator = Coordinator::new(config.coordinator.clone())?;

    // 4. Bind (LAST - only after all validation passes)
    let addr = config.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| LifecycleError::BindFailed(addr.clone(), e))?;

    if config.coordinator.auto_start {
        coordinator.set_auto_mode(true);
    }

    info!(
        addr = %listener.local_addr().map(|a| a.to_string()).unwrap_or(addr),
        replicas = config.coordinator.replica_count,
        auto = config.coordinator.auto_start,
        "Daemon started"
    );

    Ok(DaemonState {
        config: config.clone(),
        lock_file,
        listener,
        context: Arc::new(ServerContext::new(coordinator)),
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    if config.version_path.exists() {
        let _ = std::fs::remove_file(&config.version_path);
    }

    if config.pid_path.exists() {
        let _ = std::fs::remove_file(&config.pid_path);
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
