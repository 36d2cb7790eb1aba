// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signal commands: status, manual, cycle, pedestrian, history

use anyhow::Result;
use tc_core::{ManualCommand, RoadGroup};

use super::parse_road;
use crate::client::DaemonClient;
use crate::output::{self, OutputFormat};

#[derive(clap::Args)]
pub struct ManualArgs {
    /// Turn auto mode on or off
    #[arg(long, action = clap::ArgAction::Set)]
    pub auto: Option<bool>,

    /// Road or group to turn GREEN (A, B, 1-4, 12, 34); ignored while auto mode is on
    #[arg(long, value_parser = parse_road)]
    pub road: Option<RoadGroup>,
}

#[derive(clap::Args)]
pub struct CycleArgs {
    /// Road or group to turn GREEN; picked at random when omitted
    #[arg(long, value_parser = parse_road)]
    pub road: Option<RoadGroup>,
}

#[derive(clap::Args)]
pub struct PedestrianArgs {
    /// Road or group that is currently GREEN
    #[arg(value_parser = parse_road)]
    pub road: RoadGroup,
}

impl ManualArgs {
    pub fn command(&self) -> ManualCommand {
        ManualCommand {
            auto: self.auto,
            road_to_green: self.road.map(|g| g.to_string()),
        }
    }
}

pub async fn status(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    output::print(&client.status().await?, format);
    Ok(())
}

pub async fn manual(client: &DaemonClient, args: ManualArgs, format: OutputFormat) -> Result<()> {
    let status = client.manual(args.command()).await?;
    if format == OutputFormat::Text && args.road.is_some() && status.auto {
        eprintln!("Auto mode is on; road switch ignored");
    }
    output::print(&status, format);
    Ok(())
}

pub async fn cycle(client: &DaemonClient, args: CycleArgs, format: OutputFormat) -> Result<()> {
    let status = client.signal_controller(args.road).await?;
    if format == OutputFormat::Text && !status.auto {
        eprintln!("Auto mode is off; no cycle was run");
    }
    output::print(&status, format);
    Ok(())
}

pub async fn pedestrian(
    client: &DaemonClient,
    args: PedestrianArgs,
    format: OutputFormat,
) -> Result<()> {
    output::print(&client.pedestrian(args.road).await?, format);
    Ok(())
}

pub async fn history(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let commits = client.history().await?;
    output::print_list(&commits, format, "No transitions recorded");
    Ok(())
}
