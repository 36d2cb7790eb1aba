// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tc-core: concurrent signal-state coordinator
//!
//! This crate provides:
//! - Signal state for two road groups and their crossings, replicated in memory
//! - Two named, non-reentrant locks with waiter tracking
//! - Signal and pedestrian controllers that mutate state under those locks
//! - An automatic cycle loop and an opposite-order deadlock demo

pub mod clock;
pub mod config;
pub mod lock;
pub mod picker;
pub mod replica;
pub mod signal;
pub mod status;
pub mod store;

mod auto_cycle;
mod controller;
mod coordinator;
mod deadlock;
mod error;

// Re-exports
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{ConfigError, CoordinatorConfig};
pub use controller::PEDESTRIAN_OWNER;
pub use coordinator::{Coordinator, CycleOrigin, ManualCommand};
pub use deadlock::{DeadlockReport, DemoStatus, DEADLOCK_TRIGGERED};
pub use error::CoordinatorError;
pub use lock::{HolderId, LockError, LockGuard, LockId, LockManager, LockStatus};
pub use picker::{RandomPicker, SequencePicker, TargetPicker};
pub use replica::{ReplicaError, ReplicaSet};
pub use signal::{FieldUpdate, InvalidTarget, PedestrianColor, RoadGroup, SignalColor, SignalState};
pub use status::StatusSnapshot;
pub use store::Commit;
