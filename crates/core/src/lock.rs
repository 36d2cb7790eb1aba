// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named exclusive locks for the signal coordinator
//!
//! Two locks exist: `signal` guards the road signals, `pedestrian` guards the
//! crossings. Acquisition blocks the calling task until the lock is free.
//! Waiters are woken together on release and race for the lock, so there is
//! no FIFO ordering among them. Locks are not reentrant: a holder that
//! acquires a lock it already holds waits on itself forever.
//!
//! The manager also tracks who is waiting on what, so a circular wait can be
//! reported (never broken) by [`LockManager::wait_for_cycle`].

use crate::clock::{Clock, SystemClock};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Notify;

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Label identifying a lock holder (for diagnostics and release checks)
///
/// Labels are shared by concurrent callers (every manual cycle is `manual`),
/// so each `HolderId::new` also draws a token unique to that caller. Clones
/// keep the token. Equality and release checks compare labels only; the
/// wait-for graph is built on tokens.
#[derive(Clone, Debug)]
pub struct HolderId {
    label: String,
    token: u64,
}

impl HolderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            label: id.into(),
            token: NEXT_TOKEN.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether `other` was cloned from the same `HolderId::new` call
    pub fn same_caller(&self, other: &HolderId) -> bool {
        self.token == other.token
    }
}

impl PartialEq for HolderId {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label
    }
}

impl Eq for HolderId {}

impl Hash for HolderId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.label.hash(state);
    }
}

impl fmt::Display for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

impl Serialize for HolderId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label)
    }
}

impl<'de> Deserialize<'de> for HolderId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(HolderId::new)
    }
}

/// The coordinator's two locks
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockId {
    Signal,
    Pedestrian,
}

impl LockId {
    pub const ALL: [LockId; 2] = [LockId::Signal, LockId::Pedestrian];
}

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockId::Signal => write!(f, "signal_lock"),
            LockId::Pedestrian => write!(f, "pedestrian_lock"),
        }
    }
}

fn held_by(current: &Option<HolderId>) -> String {
    match current {
        Some(holder) => format!("held by {}", holder),
        None => "not held".to_string(),
    }
}

/// Lock misuse and bounded-wait failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    #[error("{holder} cannot release {lock}: {}", held_by(.current))]
    NotOwner {
        lock: LockId,
        holder: HolderId,
        current: Option<HolderId>,
    },

    #[error("{holder} gave up on {lock} after {waited:?}")]
    Timeout {
        lock: LockId,
        holder: HolderId,
        waited: Duration,
    },
}

/// Lock state
#[derive(Clone, Debug)]
pub enum LockState {
    /// Lock is available
    Free,
    /// Lock is held by a holder
    Held {
        holder: HolderId,
        acquired_at: Instant,
        since: DateTime<Utc>,
    },
}

/// Point-in-time view of one lock
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockStatus {
    pub lock: LockId,
    pub held: bool,
    pub holder: Option<HolderId>,
    pub since: Option<DateTime<Utc>>,
    pub held_for_ms: Option<u64>,
    pub waiters: Vec<HolderId>,
}

struct LockSlot<C: Clock> {
    id: LockId,
    state: Mutex<LockState>,
    waiters: Mutex<Vec<HolderId>>,
    released: Notify,
    clock: C,
}

impl<C: Clock> LockSlot<C> {
    fn new(id: LockId, clock: C) -> Self {
        Self {
            id,
            state: Mutex::new(LockState::Free),
            waiters: Mutex::new(Vec::new()),
            released: Notify::new(),
            clock,
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, LockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn try_acquire(&self, holder: &HolderId) -> bool {
        let mut state = self.state();
        match *state {
            LockState::Free => {
                *state = LockState::Held {
                    holder: holder.clone(),
                    acquired_at: self.clock.now(),
                    since: self.clock.utc_now(),
                };
                true
            }
            LockState::Held { .. } => false,
        }
    }

    async fn acquire(&self, holder: &HolderId) {
        let mut waiting: Option<WaitEntry<'_, C>> = None;
        loop {
            // Register interest before checking, so a release between the
            // check and the await still wakes us.
            let notified = self.released.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.try_acquire(holder) {
                drop(waiting);
                tracing::info!(lock = %self.id, %holder, "acquired");
                return;
            }
            if waiting.is_none() {
                tracing::debug!(
                    lock = %self.id,
                    %holder,
                    current = ?self.holder(),
                    "waiting"
                );
                waiting = Some(WaitEntry::new(self, holder));
            }
            notified.await;
        }
    }

    fn release(&self, holder: &HolderId) -> Result<(), LockError> {
        {
            let mut state = self.state();
            match &*state {
                LockState::Held {
                    holder: current, ..
                } if current == holder => {
                    *state = LockState::Free;
                }
                LockState::Held {
                    holder: current, ..
                } => {
                    return Err(LockError::NotOwner {
                        lock: self.id,
                        holder: holder.clone(),
                        current: Some(current.clone()),
                    });
                }
                LockState::Free => {
                    return Err(LockError::NotOwner {
                        lock: self.id,
                        holder: holder.clone(),
                        current: None,
                    });
                }
            }
        }
        tracing::info!(lock = %self.id, %holder, "released");
        self.released.notify_waiters();
        Ok(())
    }

    fn holder(&self) -> Option<HolderId> {
        match &*self.state() {
            LockState::Free => None,
            LockState::Held { holder, .. } => Some(holder.clone()),
        }
    }

    fn waiters(&self) -> Vec<HolderId> {
        self.waiters
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn status(&self) -> LockStatus {
        let (holder, since, held_for_ms) = match &*self.state() {
            LockState::Free => (None, None, None),
            LockState::Held {
                holder,
                acquired_at,
                since,
            } => (
                Some(holder.clone()),
                Some(*since),
                Some(
                    u64::try_from(
                        self.clock
                            .now()
                            .saturating_duration_since(*acquired_at)
                            .as_millis(),
                    )
                    .unwrap_or(u64::MAX),
                ),
            ),
        };
        LockStatus {
            lock: self.id,
            held: holder.is_some(),
            holder,
            since,
            held_for_ms,
            waiters: self.waiters(),
        }
    }
}

/// Registration in a slot's waiter list, removed when the wait ends
struct WaitEntry<'a, C: Clock> {
    slot: &'a LockSlot<C>,
    holder: HolderId,
}

impl<'a, C: Clock> WaitEntry<'a, C> {
    fn new(slot: &'a LockSlot<C>, holder: &HolderId) -> Self {
        slot.waiters
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(holder.clone());
        Self {
            slot,
            holder: holder.clone(),
        }
    }
}

impl<C: Clock> Drop for WaitEntry<'_, C> {
    fn drop(&mut self) {
        let mut waiters = self.slot.waiters.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pos) = waiters.iter().position(|w| w.same_caller(&self.holder)) {
            waiters.remove(pos);
        }
    }
}

/// Releases its lock when dropped, on every exit path
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard<'a, C: Clock = SystemClock> {
    slot: &'a LockSlot<C>,
    holder: HolderId,
}

impl<C: Clock> LockGuard<'_, C> {
    pub fn lock(&self) -> LockId {
        self.slot.id
    }

    pub fn holder(&self) -> &HolderId {
        &self.holder
    }
}

impl<C: Clock> Drop for LockGuard<'_, C> {
    fn drop(&mut self) {
        if let Err(e) = self.slot.release(&self.holder) {
            tracing::warn!(error = %e, "lock guard release failed");
        }
    }
}

/// Owner of the signal and pedestrian locks
pub struct LockManager<C: Clock = SystemClock> {
    signal: LockSlot<C>,
    pedestrian: LockSlot<C>,
}

impl<C: Clock> LockManager<C> {
    pub fn new(clock: C) -> Self {
        Self {
            signal: LockSlot::new(LockId::Signal, clock.clone()),
            pedestrian: LockSlot::new(LockId::Pedestrian, clock),
        }
    }

    fn slot(&self, id: LockId) -> &LockSlot<C> {
        match id {
            LockId::Signal => &self.signal,
            LockId::Pedestrian => &self.pedestrian,
        }
    }

    /// Wait until `id` is free and take it; pair with [`LockManager::release`]
    ///
    /// Never times out. Acquiring a lock the holder already holds deadlocks.
    pub async fn acquire(&self, id: LockId, holder: &HolderId) {
        self.slot(id).acquire(holder).await;
    }

    /// Take `id` without waiting
    pub fn try_acquire(&self, id: LockId, holder: &HolderId) -> bool {
        let acquired = self.slot(id).try_acquire(holder);
        if acquired {
            tracing::info!(lock = %id, %holder, "acquired");
        }
        acquired
    }

    /// Release `id`; fails with `NotOwner` unless `holder` holds it
    pub fn release(&self, id: LockId, holder: &HolderId) -> Result<(), LockError> {
        self.slot(id).release(holder)
    }

    /// Wait for `id` and return a guard that releases it on drop
    pub async fn lock(&self, id: LockId, holder: HolderId) -> LockGuard<'_, C> {
        let slot = self.slot(id);
        slot.acquire(&holder).await;
        LockGuard { slot, holder }
    }

    /// Like [`LockManager::lock`], but give up after `timeout`
    pub async fn lock_timeout(
        &self,
        id: LockId,
        holder: HolderId,
        timeout: Duration,
    ) -> Result<LockGuard<'_, C>, LockError> {
        let slot = self.slot(id);
        match tokio::time::timeout(timeout, slot.acquire(&holder)).await {
            Ok(()) => Ok(LockGuard { slot, holder }),
            Err(_) => {
                tracing::warn!(lock = %id, %holder, ?timeout, "lock wait timed out");
                Err(LockError::Timeout {
                    lock: id,
                    holder,
                    waited: timeout,
                })
            }
        }
    }

    pub fn holder(&self, id: LockId) -> Option<HolderId> {
        self.slot(id).holder()
    }

    pub fn is_held(&self, id: LockId) -> bool {
        self.holder(id).is_some()
    }

    /// Holders currently blocked waiting on `id`
    pub fn waiters(&self, id: LockId) -> Vec<HolderId> {
        self.slot(id).waiters()
    }

    pub fn status(&self, id: LockId) -> LockStatus {
        self.slot(id).status()
    }

    /// Find a circular wait among holders, if one exists
    ///
    /// An edge runs from each waiter to the holder of the lock it waits on.
    /// Nodes are callers, not labels: two concurrent cycles both labelled
    /// `manual` are distinct nodes. A caller waiting on a lock it already
    /// holds shows up as a cycle of one.
    pub fn wait_for_cycle(&self) -> Option<Vec<HolderId>> {
        let mut edges: HashMap<u64, Vec<u64>> = HashMap::new();
        let mut callers: HashMap<u64, HolderId> = HashMap::new();
        let mut order = Vec::new();
        for id in LockId::ALL {
            let slot = self.slot(id);
            let Some(holder) = slot.holder() else {
                continue;
            };
            for waiter in slot.waiters() {
                if !edges.contains_key(&waiter.token) {
                    order.push(waiter.token);
                }
                edges.entry(waiter.token).or_default().push(holder.token);
                callers.entry(waiter.token).or_insert(waiter);
            }
            callers.entry(holder.token).or_insert(holder);
        }

        let mut path = Vec::new();
        let cycle = order
            .iter()
            .find_map(|start| find_cycle(*start, &edges, &mut path))?;
        Some(
            cycle
                .iter()
                .filter_map(|token| callers.get(token).cloned())
                .collect(),
        )
    }
}

fn find_cycle(node: u64, edges: &HashMap<u64, Vec<u64>>, path: &mut Vec<u64>) -> Option<Vec<u64>> {
    if let Some(pos) = path.iter().position(|n| *n == node) {
        return Some(path[pos..].to_vec());
    }
    path.push(node);
    let found = edges
        .get(&node)
        .into_iter()
        .flatten()
        .find_map(|next| find_cycle(*next, edges, path));
    path.pop();
    found
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
