// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tc-daemon: host process for the signal coordinator
//!
//! Owns one coordinator and serves it over TCP using the length-prefixed
//! JSON protocol in [`protocol`].

pub mod lifecycle;
pub mod protocol;
pub mod server;

pub use lifecycle::{Config, LifecycleError};
pub use protocol::{ProtocolError, Request, Response, PROTOCOL_VERSION};

/// Startup marker prefix written to log before anything else.
/// The CLI uses this to find where the current startup attempt begins.
/// Full format: "--- tcd: starting (pid: 12345)"
pub const STARTUP_MARKER_PREFIX: &str = "--- tcd: starting (pid: ";
