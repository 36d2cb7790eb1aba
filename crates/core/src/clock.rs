// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for lock hold-time diagnostics
//!
//! Lock holders are stamped with both a monotonic instant (for `held_for`)
//! and a wall-clock time (for the status snapshot). Sleeps inside the
//! coordinator go through `tokio::time` and are not routed through here.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A clock that provides the current time
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;
    fn utc_now(&self) -> DateTime<Utc>;
}

/// Real system clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug)]
struct FakeTime {
    instant: Instant,
    wall: DateTime<Utc>,
}

/// Fake clock for testing with controllable time
#[derive(Clone, Debug)]
pub struct FakeClock {
    current: Arc<Mutex<FakeTime>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            current: Arc::new(Mutex::new(FakeTime {
                instant: Instant::now(),
                wall: Utc::now(),
            })),
        }
    }

    /// Advance both the monotonic and the wall clock by the given duration
    pub fn advance(&self, duration: Duration) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        current.instant += duration;
        if let Ok(delta) = chrono::Duration::from_std(duration) {
            current.wall += delta;
        }
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .instant
    }

    fn utc_now(&self) -> DateTime<Utc> {
        self.current.lock().unwrap_or_else(|e| e.into_inner()).wall
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
