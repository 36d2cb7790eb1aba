// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol between the `tc` CLI and the `tcd` daemon
//!
//! Each connection carries one request and one response. A message is a
//! 4-byte big-endian length followed by that many bytes of JSON.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tc_core::{Commit, DeadlockReport, ManualCommand, StatusSnapshot};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Version reported in the `Hello` handshake
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default per-frame read/write timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest accepted message body
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Requests from CLI to daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Liveness check
    Ping,

    /// Version handshake
    Hello { version: String },

    /// Daemon uptime and sizing
    Info,

    /// Current status snapshot
    Status,

    /// Set auto mode and/or switch a group to GREEN
    Manual {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        auto: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        road_to_green: Option<String>,
    },

    /// Run one automatic cycle (no-op while auto mode is off)
    SignalController {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        road: Option<String>,
    },

    /// Set the crossings for a GREEN group
    PedestrianController { road: String },

    /// Start the opposite-order lock demo
    TriggerDeadlock,

    /// Transition journal
    History,

    /// Request daemon shutdown
    Shutdown,
}

impl Request {
    pub fn manual(command: ManualCommand) -> Self {
        Request::Manual {
            auto: command.auto,
            road_to_green: command.road_to_green,
        }
    }
}

/// Responses from daemon to CLI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    Pong,

    Hello {
        version: String,
    },

    Info {
        version: String,
        uptime_secs: u64,
        replica_count: usize,
        amber_ms: u64,
    },

    Status {
        status: Box<StatusSnapshot>,
    },

    Deadlock {
        report: DeadlockReport,
    },

    History {
        commits: Vec<Commit>,
    },

    /// Daemon is shutting down
    ShuttingDown,

    /// Error response
    Error {
        message: String,
    },
}

/// Protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Timeout")]
    Timeout,
}

/// Serialize a message to JSON bytes (no length prefix)
pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(msg)?)
}

/// Deserialize a message from JSON bytes
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Write a length-prefixed message
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    data: &[u8],
) -> Result<(), ProtocolError> {
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: data.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    writer.write_all(&(data.len() as u32).to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Read a length-prefixed message
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed);
        }
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        });
    }

    let mut data = vec![0u8; len];
    reader.read_exact(&mut data).await?;
    Ok(data)
}

/// Read and decode a request, giving up after `timeout`
pub async fn read_request<R: AsyncRead + Unpin>(
    reader: &mut R,
    timeout: Duration,
) -> Result<Request, ProtocolError> {
    let bytes = tokio::time::timeout(timeout, read_message(reader))
        .await
        .map_err(|_| ProtocolError::Timeout)??;
    decode(&bytes)
}

/// Encode and write a response, giving up after `timeout`
pub async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &Response,
    timeout: Duration,
) -> Result<(), ProtocolError> {
    let data = encode(response)?;
    tokio::time::timeout(timeout, write_message(writer, &data))
        .await
        .map_err(|_| ProtocolError::Timeout)?
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
