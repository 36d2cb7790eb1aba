// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status snapshot returned by every coordinator operation
//!
//! Snapshots are read without taking either coordinator lock, so one taken
//! mid-cycle may show an amber phase or crossings not yet updated.

use crate::deadlock::DemoStatus;
use crate::lock::{HolderId, LockStatus};
use crate::signal::{PedestrianColor, RoadGroup, SignalColor, SignalState};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub road_a: SignalColor,
    pub road_b: SignalColor,
    pub pedestrian_a: PedestrianColor,
    pub pedestrian_b: PedestrianColor,
    /// Automatic mode flag
    pub auto: bool,
    pub loop_running: bool,
    /// Holder of the signal lock
    pub lock_owner: Option<HolderId>,
    pub signal_locked: bool,
    pub pedestrian_locked: bool,
    pub locks: Vec<LockStatus>,
    /// Target of the most recent cycle
    pub road_to_green: Option<RoadGroup>,
    pub replicas: Vec<SignalState>,
    /// Most recent deadlock demo, if any was triggered
    pub deadlock: Option<DemoStatus>,
}

impl StatusSnapshot {
    pub fn signals(&self) -> SignalState {
        SignalState {
            road_a: self.road_a,
            road_b: self.road_b,
            pedestrian_a: self.pedestrian_a,
            pedestrian_b: self.pedestrian_b,
        }
    }

    /// All replicas equal the primary
    pub fn replicas_consistent(&self) -> bool {
        let primary = self.signals();
        self.replicas.iter().all(|r| *r == primary)
    }
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Road A:          {:<8} Pedestrian A: {}",
            self.road_a, self.pedestrian_a
        )?;
        writeln!(
            f,
            "Road B:          {:<8} Pedestrian B: {}",
            self.road_b, self.pedestrian_b
        )?;
        writeln!(
            f,
            "Auto mode:       {} (loop {})",
            if self.auto { "on" } else { "off" },
            if self.loop_running { "running" } else { "stopped" }
        )?;
        for lock in &self.locks {
            match (&lock.holder, lock.held_for_ms) {
                (Some(holder), Some(ms)) => {
                    writeln!(f, "{:<16} held by {} ({}ms)", format!("{}:", lock.lock), holder, ms)?
                }
                (Some(holder), None) => {
                    writeln!(f, "{:<16} held by {}", format!("{}:", lock.lock), holder)?
                }
                (None, _) => writeln!(f, "{:<16} free", format!("{}:", lock.lock))?,
            }
            if !lock.waiters.is_empty() {
                let names: Vec<_> = lock.waiters.iter().map(|w| w.to_string()).collect();
                writeln!(f, "                 waiting: {}", names.join(", "))?;
            }
        }
        write!(
            f,
            "Replicas:        {} ({})",
            self.replicas.len(),
            if self.replicas_consistent() {
                "consistent"
            } else {
                "diverged"
            }
        )?;
        if let Some(demo) = &self.deadlock {
            write!(f, "\nDeadlock demo:   {}", demo)?;
        }
        Ok(())
    }
}
