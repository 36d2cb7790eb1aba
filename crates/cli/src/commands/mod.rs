// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod daemon;
pub mod deadlock;
pub mod signal;

use tc_core::RoadGroup;

/// Parse a road or group label for clap, rejecting it before any connection
pub fn parse_road(s: &str) -> Result<RoadGroup, String> {
    s.parse::<RoadGroup>().map_err(|e| e.to_string())
}
