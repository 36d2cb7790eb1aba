// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client for CLI commands

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use serde::Serialize;
use tc_core::{Commit, DeadlockReport, ManualCommand, RoadGroup, StatusSnapshot};
use tc_daemon::protocol::{self, ProtocolError};
use tc_daemon::{Request, Response, STARTUP_MARKER_PREFIX};
use thiserror::Error;
use tokio::net::TcpStream;

/// Address used when neither `--addr` nor `TC_ADDR` is given
pub const DEFAULT_ADDR: &str = "127.0.0.1:3000";

// Timeout configuration (env vars in milliseconds)
fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Timeout for IPC requests
pub fn timeout_ipc() -> Duration {
    parse_duration_ms("TC_TIMEOUT_IPC_MS").unwrap_or(Duration::from_secs(5))
}

/// Read timeout for requests that may run a signal cycle
///
/// The daemon replies only after the amber phase, so the IPC timeout is
/// extended by the daemon's amber duration.
pub fn timeout_cycle(amber: Duration) -> Duration {
    timeout_ipc().saturating_add(amber)
}

/// Timeout for waiting for daemon to start
pub fn timeout_connect() -> Duration {
    parse_duration_ms("TC_TIMEOUT_CONNECT_MS").unwrap_or(Duration::from_secs(5))
}

/// Timeout for waiting for process to exit
pub fn timeout_exit() -> Duration {
    parse_duration_ms("TC_TIMEOUT_EXIT_MS").unwrap_or(Duration::from_secs(5))
}

/// Polling interval for retries
pub fn poll_interval() -> Duration {
    parse_duration_ms("TC_POLL_INTERVAL_MS").unwrap_or(Duration::from_millis(50))
}

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Daemon not running")]
    DaemonNotRunning,

    #[error("Failed to start daemon: {0}")]
    DaemonStartFailed(String),

    #[error("Connection timeout waiting for daemon to start")]
    DaemonStartTimeout,

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("{0}")]
    Rejected(String),

    #[error("Unexpected response from daemon")]
    UnexpectedResponse,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Daemon info reported by `tc daemon status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaemonInfo {
    pub version: String,
    pub uptime_secs: u64,
    pub replica_count: usize,
    pub amber_ms: u64,
}

/// Daemon client
pub struct DaemonClient {
    addr: String,
}

impl DaemonClient {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Send a request and receive a response with specific timeouts
    async fn send_with_timeout(
        &self,
        request: Request,
        read_timeout: Duration,
        write_timeout: Duration,
    ) -> Result<Response, ClientError> {
        let stream = match TcpStream::connect(&self.addr).await {
            Ok(stream) => stream,
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
                return Err(ClientError::DaemonNotRunning);
            }
            Err(e) => return Err(e.into()),
        };
        let (mut reader, mut writer) = stream.into_split();

        let data = protocol::encode(&request)?;
        tokio::time::timeout(write_timeout, protocol::write_message(&mut writer, &data))
            .await
            .map_err(|_| ProtocolError::Timeout)??;

        let response_bytes =
            tokio::time::timeout(read_timeout, protocol::read_message(&mut reader))
                .await
                .map_err(|_| ProtocolError::Timeout)??;

        let response: Response = protocol::decode(&response_bytes)?;
        Ok(response)
    }

    /// Send a request and receive a response
    pub async fn send(&self, request: Request) -> Result<Response, ClientError> {
        self.send_with_timeout(request, timeout_ipc(), timeout_ipc())
            .await
    }

    async fn send_for_status(&self, request: Request) -> Result<StatusSnapshot, ClientError> {
        into_status(self.send(request).await?)
    }

    /// Send a request that may run a signal cycle, waiting out the amber phase
    async fn send_for_cycle(&self, request: Request) -> Result<StatusSnapshot, ClientError> {
        let amber = Duration::from_millis(self.info().await?.amber_ms);
        let response = self
            .send_with_timeout(request, timeout_cycle(amber), timeout_ipc())
            .await?;
        into_status(response)
    }

    pub async fn ping(&self) -> Result<(), ClientError> {
        match self.send(Request::Ping).await? {
            Response::Pong => Ok(()),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Get daemon version via Hello handshake
    pub async fn hello(&self) -> Result<String, ClientError> {
        match self
            .send(Request::Hello {
                version: env!("CARGO_PKG_VERSION").to_string(),
            })
            .await?
        {
            Response::Hello { version } => Ok(version),
            Response::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn info(&self) -> Result<DaemonInfo, ClientError> {
        match self.send(Request::Info).await? {
            Response::Info {
                version,
                uptime_secs,
                replica_count,
                amber_ms,
            } => Ok(DaemonInfo {
                version,
                uptime_secs,
                replica_count,
                amber_ms,
            }),
            Response::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn status(&self) -> Result<StatusSnapshot, ClientError> {
        self.send_for_status(Request::Status).await
    }

    pub async fn manual(&self, command: ManualCommand) -> Result<StatusSnapshot, ClientError> {
        if command.road_to_green.is_some() {
            self.send_for_cycle(Request::manual(command)).await
        } else {
            self.send_for_status(Request::manual(command)).await
        }
    }

    pub async fn signal_controller(
        &self,
        road: Option<RoadGroup>,
    ) -> Result<StatusSnapshot, ClientError> {
        self.send_for_cycle(Request::SignalController {
            road: road.map(|g| g.to_string()),
        })
        .await
    }

    pub async fn pedestrian(&self, road: RoadGroup) -> Result<StatusSnapshot, ClientError> {
        self.send_for_status(Request::PedestrianController {
            road: road.to_string(),
        })
        .await
    }

    pub async fn trigger_deadlock(&self) -> Result<DeadlockReport, ClientError> {
        match self.send(Request::TriggerDeadlock).await? {
            Response::Deadlock { report } => Ok(report),
            Response::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    pub async fn history(&self) -> Result<Vec<Commit>, ClientError> {
        match self.send(Request::History).await? {
            Response::History { commits } => Ok(commits),
            Response::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Request daemon shutdown
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        match self.send(Request::Shutdown).await? {
            Response::ShuttingDown => Ok(()),
            Response::Error { message } => Err(ClientError::Rejected(message)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Poll until the daemon answers, watching `child` for an early exit
    pub async fn wait_until_ready(
        &self,
        mut child: std::process::Child,
        log_path: &Path,
    ) -> Result<(), ClientError> {
        let start = Instant::now();
        while start.elapsed() < timeout_connect() {
            // Check if daemon process exited early (startup failure)
            if let Ok(Some(status)) = child.try_wait() {
                // Poll for startup error in log (filesystem may need to sync)
                let poll_start = Instant::now();
                while poll_start.elapsed() < timeout_exit() {
                    if let Some(err) = read_startup_error(log_path) {
                        return Err(ClientError::DaemonStartFailed(err));
                    }
                    tokio::time::sleep(poll_interval()).await;
                }
                return Err(ClientError::DaemonStartFailed(format!(
                    "exited with {}",
                    status
                )));
            }

            match self.ping().await {
                Ok(()) => return Ok(()),
                Err(ClientError::DaemonNotRunning) => {
                    tokio::time::sleep(poll_interval()).await;
                }
                Err(e) => return Err(wrap_with_startup_error(e, log_path)),
            }
        }

        Err(wrap_with_startup_error(
            ClientError::DaemonStartTimeout,
            log_path,
        ))
    }
}

fn into_status(response: Response) -> Result<StatusSnapshot, ClientError> {
    match response {
        Response::Status { status } => Ok(*status),
        Response::Error { message } => Err(ClientError::Rejected(message)),
        _ => Err(ClientError::UnexpectedResponse),
    }
}

/// Start the daemon in the background, returning the child process handle
pub fn start_daemon_background(
    config_path: Option<&Path>,
    addr: Option<&str>,
) -> Result<std::process::Child, ClientError> {
    let tcd_path = find_tcd_binary();

    let mut command = Command::new(&tcd_path);
    if let Some(path) = config_path {
        command.arg("--config").arg(path);
    }
    // An explicit --addr pins where the daemon listens
    if let Some((bind, port)) = addr.and_then(|a| a.rsplit_once(':')) {
        command.env("TC_BIND", bind).env("TC_PORT", port);
    }

    command
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|e| ClientError::DaemonStartFailed(format!("{}: {}", tcd_path.display(), e)))
}

/// Stop the daemon (graceful first, then forceful)
/// Returns true if daemon was stopped, false if it wasn't running
pub async fn daemon_stop(client: &DaemonClient, pid_path: &Path) -> Result<bool, ClientError> {
    let shutdown_result = client.shutdown().await;
    if let Err(ClientError::DaemonNotRunning) = shutdown_result {
        return Ok(false);
    }

    if let Some(pid) = read_daemon_pid(pid_path) {
        if shutdown_result.is_ok() {
            // Graceful shutdown succeeded, wait for process to exit
            wait_for_exit(pid, timeout_exit()).await;
        }

        // Force kill if still running
        if process_exists(pid) {
            force_kill_daemon(pid);
            wait_for_exit(pid, timeout_exit()).await;
        }
    }

    Ok(true)
}

/// Wait for a process to exit
async fn wait_for_exit(pid: u32, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if !process_exists(pid) {
            return true;
        }
        tokio::time::sleep(poll_interval()).await;
    }
    false
}

/// Find the tcd binary
fn find_tcd_binary() -> PathBuf {
    // Explicit override (used by tests to ensure correct binary)
    if let Ok(path) = std::env::var("TC_DAEMON_BINARY") {
        return PathBuf::from(path);
    }

    // Check current executable's directory
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("tcd");
            if sibling.exists() {
                return sibling;
            }
        }
    }

    // Fall back to PATH lookup
    PathBuf::from("tcd")
}

/// Get the PID from the daemon PID file, if it exists
pub fn read_daemon_pid(pid_path: &Path) -> Option<u32> {
    std::fs::read_to_string(pid_path)
        .ok()
        .and_then(|content| content.trim().parse::<u32>().ok())
}

/// Check if a process with the given PID exists
pub fn process_exists(pid: u32) -> bool {
    // Use kill -0 to check if process exists without sending a signal
    Command::new("kill")
        .args(["-0", &pid.to_string()])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Force kill a daemon process
pub fn force_kill_daemon(pid: u32) -> bool {
    Command::new("kill")
        .args(["-9", &pid.to_string()])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Read daemon log from the last startup marker, looking for errors.
/// Returns the error message if found, None otherwise.
pub fn read_startup_error(log_path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(log_path).ok()?;
    startup_error_in(&content)
}

fn startup_error_in(content: &str) -> Option<String> {
    let start_pos = content.rfind(STARTUP_MARKER_PREFIX)?;
    let startup_log = &content[start_pos..];

    let errors: Vec<&str> = startup_log
        .lines()
        .filter(|line| line.contains(" ERROR ") || line.contains("Failed to start"))
        .collect();

    if errors.is_empty() {
        return None;
    }

    // Extract just the error messages (strip timestamp/level prefix)
    let error_messages: Vec<String> = errors
        .iter()
        .filter_map(|line| line.split_once(": ").map(|(_, msg)| msg.to_string()))
        .collect();

    if error_messages.is_empty() {
        Some(errors.join("\n"))
    } else {
        Some(error_messages.join("\n"))
    }
}

/// Wrap an error with startup log info if available.
fn wrap_with_startup_error(err: ClientError, log_path: &Path) -> ClientError {
    if matches!(err, ClientError::DaemonStartFailed(_)) {
        return err;
    }

    match read_startup_error(log_path) {
        Some(startup_error) => ClientError::DaemonStartFailed(startup_error),
        None => err,
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
