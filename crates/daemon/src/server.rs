// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TCP server and request handling.

use std::sync::Arc;
use std::time::Instant;

use tc_core::{Coordinator, CoordinatorError, ManualCommand, RoadGroup, StatusSnapshot};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tracing::{debug, error, Instrument};

use crate::protocol::{self, Request, Response, DEFAULT_TIMEOUT, PROTOCOL_VERSION};

/// State shared by every connection task
pub struct ServerContext {
    pub coordinator: Coordinator,
    pub start_time: Instant,
    /// Notified once when a client requests shutdown
    pub shutdown: Notify,
}

impl ServerContext {
    pub fn new(coordinator: Coordinator) -> Self {
        Self {
            coordinator,
            start_time: Instant::now(),
            shutdown: Notify::new(),
        }
    }
}

/// Accept connections forever, serving each on its own task
///
/// A slow request (a signal cycle holds its caller for the amber phase) never
/// delays other clients.
pub async fn serve(listener: &TcpListener, ctx: Arc<ServerContext>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let ctx = Arc::clone(&ctx);
                tokio::spawn(
                    async move {
                        if let Err(e) = handle_connection(&ctx, stream).await {
                            error!("Error handling connection: {}", e);
                        }
                    }
                    .instrument(tracing::debug_span!("connection", %peer)),
                );
            }
            Err(e) => {
                error!("Error accepting connection: {}", e);
            }
        }
    }
}

/// Handle a single client connection
pub async fn handle_connection(ctx: &ServerContext, stream: TcpStream) -> Result<(), ServerError> {
    let (mut reader, mut writer) = stream.into_split();

    let request = match protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await {
        Ok(req) => req,
        Err(protocol::ProtocolError::Timeout) => {
            error!("Request read timeout");
            return Err(ServerError::Timeout);
        }
        Err(protocol::ProtocolError::ConnectionClosed) => {
            debug!("Client disconnected before sending request");
            return Ok(());
        }
        Err(e) => {
            error!("Failed to read request: {}", e);
            return Err(ServerError::Protocol(e));
        }
    };

    debug!("Received request: {:?}", request);

    let response = handle_request(ctx, request).await;

    debug!("Sending response: {:?}", response);

    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT)
        .await
        .map_err(ServerError::Protocol)?;

    Ok(())
}

/// Handle a single request and return a response
pub async fn handle_request(ctx: &ServerContext, request: Request) -> Response {
    let coordinator = &ctx.coordinator;

    match request {
        Request::Ping => Response::Pong,

        Request::Hello { version: _ } => Response::Hello {
            version: PROTOCOL_VERSION.to_string(),
        },

        Request::Info => Response::Info {
            version: PROTOCOL_VERSION.to_string(),
            uptime_secs: ctx.start_time.elapsed().as_secs(),
            replica_count: coordinator.config().replica_count,
            amber_ms: u64::try_from(coordinator.config().amber_duration.as_millis())
                .unwrap_or(u64::MAX),
        },

        Request::Status => status(Ok(coordinator.status())),

        Request::Manual {
            auto,
            road_to_green,
        } => {
            let command = ManualCommand {
                auto,
                road_to_green,
            };
            status(coordinator.set_manual(command).await)
        }

        Request::SignalController { road } => match parse_road(road.as_deref()) {
            Ok(target) => status(coordinator.signal_controller(target).await),
            Err(e) => error_response(e),
        },

        Request::PedestrianController { road } => match road.parse::<RoadGroup>() {
            Ok(group) => status(coordinator.update_for_group(group).await),
            Err(e) => error_response(e.into()),
        },

        Request::TriggerDeadlock => match coordinator.trigger_deadlock() {
            Ok(report) => Response::Deadlock { report },
            Err(e) => error_response(e),
        },

        Request::History => Response::History {
            commits: coordinator.history(),
        },

        Request::Shutdown => {
            ctx.shutdown.notify_one();
            Response::ShuttingDown
        }
    }
}

fn parse_road(road: Option<&str>) -> Result<Option<RoadGroup>, CoordinatorError> {
    match road.map(str::trim) {
        None | Some("") => Ok(None),
        Some(label) => Ok(Some(label.parse()?)),
    }
}

fn status(result: Result<StatusSnapshot, CoordinatorError>) -> Response {
    match result {
        Ok(status) => Response::Status {
            status: Box::new(status),
        },
        Err(e) => error_response(e),
    }
}

fn error_response(e: CoordinatorError) -> Response {
    tracing::warn!(error = %e, "request failed");
    Response::Error {
        message: e.to_string(),
    }
}

/// Server errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),

    #[error("Request timeout")]
    Timeout,
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
