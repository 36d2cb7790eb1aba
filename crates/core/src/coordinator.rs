// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The signal coordinator: owned state, locks and mode flags
//!
//! One `Coordinator` exists per host process. It is a cheap handle (clones
//! share state) so background tasks can hold their own copy. Operations are
//! split across modules:
//! - `controller` - signal cycle and pedestrian update
//! - `auto_cycle` - auto mode and the background loop
//! - `deadlock` - the opposite-order lock demo

use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, CoordinatorConfig};
use crate::deadlock::DemoRun;
use crate::error::CoordinatorError;
use crate::lock::{HolderId, LockId, LockManager};
use crate::picker::{RandomPicker, TargetPicker};
use crate::replica::ReplicaError;
use crate::signal::{FieldUpdate, RoadGroup, SignalState};
use crate::status::StatusSnapshot;
use crate::store::{Commit, SignalStore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Who started a signal cycle; becomes the lock owner label
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOrigin {
    Manual,
    Automatic,
}

impl CycleOrigin {
    pub fn holder(self) -> HolderId {
        HolderId::new(self.to_string())
    }
}

impl fmt::Display for CycleOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleOrigin::Manual => write!(f, "manual"),
            CycleOrigin::Automatic => write!(f, "auto-cycle"),
        }
    }
}

/// Parameters of the manual command
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualCommand {
    /// New auto mode, if changing it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto: Option<bool>,
    /// Road or group to turn GREEN (only honored with auto mode off)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub road_to_green: Option<String>,
}

impl ManualCommand {
    pub fn auto(enabled: bool) -> Self {
        Self {
            auto: Some(enabled),
            road_to_green: None,
        }
    }

    pub fn switch_to(road: impl Into<String>) -> Self {
        Self {
            auto: None,
            road_to_green: Some(road.into()),
        }
    }

    pub fn with_auto(mut self, enabled: bool) -> Self {
        self.auto = Some(enabled);
        self
    }

    /// Parse the target label; blank counts as absent
    pub fn target(&self) -> Result<Option<RoadGroup>, CoordinatorError> {
        match self.road_to_green.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(label) => Ok(Some(label.parse()?)),
        }
    }
}

pub(crate) struct Inner<C: Clock> {
    pub(crate) config: CoordinatorConfig,
    pub(crate) clock: C,
    pub(crate) locks: LockManager<C>,
    store: Mutex<SignalStore>,
    pub(crate) auto_mode: AtomicBool,
    pub(crate) loop_running: AtomicBool,
    pub(crate) active_loops: AtomicUsize,
    road_to_green: Mutex<Option<RoadGroup>>,
    pub(crate) picker: Box<dyn TargetPicker>,
    pub(crate) demo: Mutex<Option<Arc<DemoRun>>>,
}

/// Shared handle to the coordinator state
pub struct Coordinator<C: Clock = SystemClock> {
    pub(crate) inner: Arc<Inner<C>>,
}

impl<C: Clock> Clone for Coordinator<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Coordinator<SystemClock> {
    /// Create a coordinator with the system clock and a random picker
    pub fn new(config: CoordinatorConfig) -> Result<Self, ConfigError> {
        let picker: Box<dyn TargetPicker> = match config.seed {
            Some(seed) => Box::new(RandomPicker::seeded(seed)),
            None => Box::new(RandomPicker::from_entropy()),
        };
        Self::with_parts(config, SystemClock, picker)
    }
}

impl<C: Clock> Coordinator<C> {
    /// Create a coordinator with an explicit clock and target picker
    ///
    /// Auto mode starts off; the host decides whether to enable it.
    pub fn with_parts(
        config: CoordinatorConfig,
        clock: C,
        picker: Box<dyn TargetPicker>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let store = SignalStore::new(config.replica_count, config.history_limit);
        Ok(Self {
            inner: Arc::new(Inner {
                locks: LockManager::new(clock.clone()),
                clock,
                store: Mutex::new(store),
                auto_mode: AtomicBool::new(false),
                loop_running: AtomicBool::new(false),
                active_loops: AtomicUsize::new(0),
                road_to_green: Mutex::new(None),
                picker,
                demo: Mutex::new(None),
                config,
            }),
        })
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    pub fn locks(&self) -> &LockManager<C> {
        &self.inner.locks
    }

    pub fn auto_mode(&self) -> bool {
        self.inner.auto_mode.load(Ordering::SeqCst)
    }

    pub fn loop_running(&self) -> bool {
        self.inner.loop_running.load(Ordering::SeqCst)
    }

    /// Current primary signal state (unlocked read)
    pub fn signals(&self) -> SignalState {
        *self.store().primary()
    }

    /// Best-effort snapshot; takes neither coordinator lock
    pub fn status(&self) -> StatusSnapshot {
        let (primary, replicas) = {
            let store = self.store();
            (*store.primary(), store.replicas().states())
        };
        let locks: Vec<_> = LockId::ALL
            .iter()
            .map(|&id| self.inner.locks.status(id))
            .collect();

        StatusSnapshot {
            road_a: primary.road_a,
            road_b: primary.road_b,
            pedestrian_a: primary.pedestrian_a,
            pedestrian_b: primary.pedestrian_b,
            auto: self.auto_mode(),
            loop_running: self.loop_running(),
            lock_owner: self.inner.locks.holder(LockId::Signal),
            signal_locked: self.inner.locks.is_held(LockId::Signal),
            pedestrian_locked: self.inner.locks.is_held(LockId::Pedestrian),
            locks,
            road_to_green: *self.road_to_green(),
            replicas,
            deadlock: self.demo_status(),
        }
    }

    /// Journal of committed writes, oldest first
    pub fn history(&self) -> Vec<Commit> {
        self.store().history()
    }

    /// Take a replica offline (writes then fail as transition faults) or back online
    pub fn set_replica_online(&self, index: usize, online: bool) -> Result<(), ReplicaError> {
        self.store().set_replica_online(index, online)?;
        tracing::info!(index, online, "replica availability changed");
        Ok(())
    }

    /// Apply a manual command
    ///
    /// The target label is validated before anything changes. Auto mode is
    /// updated first; a switch is only performed with auto mode off.
    pub async fn set_manual(
        &self,
        command: ManualCommand,
    ) -> Result<StatusSnapshot, CoordinatorError> {
        let target = command.target()?;

        if let Some(enabled) = command.auto {
            self.set_auto_mode(enabled);
        }

        match target {
            Some(target) if !self.auto_mode() => self.run_cycle(target, CycleOrigin::Manual).await,
            _ => Ok(self.status()),
        }
    }

    /// Run one automatic cycle on request; a no-op while auto mode is off
    pub async fn signal_controller(
        &self,
        target: Option<RoadGroup>,
    ) -> Result<StatusSnapshot, CoordinatorError> {
        if !self.auto_mode() {
            return Ok(self.status());
        }
        let target = target.unwrap_or_else(|| self.inner.picker.pick());
        self.run_cycle(target, CycleOrigin::Automatic).await
    }

    /// Stop scheduling new automatic cycles
    ///
    /// A cycle already in flight completes; nothing is cancelled.
    pub fn shutdown(&self) {
        self.inner.auto_mode.store(false, Ordering::SeqCst);
        tracing::info!("coordinator shutting down, auto mode off");
    }

    pub(crate) fn store(&self) -> MutexGuard<'_, SignalStore> {
        self.inner.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn road_to_green(&self) -> MutexGuard<'_, Option<RoadGroup>> {
        self.inner
            .road_to_green
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn commit(
        &self,
        owner: &HolderId,
        updates: &[FieldUpdate],
    ) -> Result<u64, CoordinatorError> {
        Ok(self.store().commit(owner, updates)?)
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
