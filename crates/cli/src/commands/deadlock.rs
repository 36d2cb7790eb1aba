// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deadlock demo trigger

use anyhow::Result;

use crate::client::DaemonClient;
use crate::output::{self, OutputFormat};

pub async fn trigger(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let report = client.trigger_deadlock().await?;

    match format {
        OutputFormat::Text => {
            println!("{} ({})", report.status, report.demo_id);
            println!("{}", report.message);
            println!("{}", report.explanation);
            println!();
            println!("Signal and pedestrian commands will now block; watch `tc status`.");
        }
        OutputFormat::Json => output::print_json(&report),
    }
    Ok(())
}
