// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory replicas of the signal state
//!
//! A write is fanned out to every replica or to none: all replicas are
//! checked before the first one is mutated, so a refused write never leaves
//! the set partially updated.

use crate::signal::{FieldUpdate, SignalState};
use thiserror::Error;

/// Errors from a replica fan-out write
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplicaError {
    #[error("replica {index} is offline")]
    Offline { index: usize },

    #[error("replica index {index} out of range (have {count})")]
    NoSuchReplica { index: usize, count: usize },
}

#[derive(Clone, Debug)]
struct Replica {
    state: SignalState,
    online: bool,
}

/// An ordered set of replicas, identified only by index
#[derive(Clone, Debug)]
pub struct ReplicaSet {
    replicas: Vec<Replica>,
}

impl ReplicaSet {
    /// Create `count` replicas, all initialized to `initial`
    pub fn new(count: usize, initial: SignalState) -> Self {
        Self {
            replicas: vec![
                Replica {
                    state: initial,
                    online: true,
                };
                count
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.replicas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replicas.is_empty()
    }

    /// Snapshot of every replica's state, in index order
    pub fn states(&self) -> Vec<SignalState> {
        self.replicas.iter().map(|r| r.state).collect()
    }

    /// True when every replica equals `primary`
    pub fn is_consistent_with(&self, primary: &SignalState) -> bool {
        self.replicas.iter().all(|r| r.state == *primary)
    }

    /// Take a replica offline (it refuses writes) or bring it back
    pub fn set_online(&mut self, index: usize, online: bool) -> Result<(), ReplicaError> {
        let count = self.replicas.len();
        let replica = self
            .replicas
            .get_mut(index)
            .ok_or(ReplicaError::NoSuchReplica { index, count })?;
        replica.online = online;
        Ok(())
    }

    /// Check that every replica will accept a write
    pub fn check_writable(&self) -> Result<(), ReplicaError> {
        match self.replicas.iter().position(|r| !r.online) {
            Some(index) => Err(ReplicaError::Offline { index }),
            None => Ok(()),
        }
    }

    /// Apply `updates` to every replica, or to none
    pub fn write(&mut self, updates: &[FieldUpdate]) -> Result<(), ReplicaError> {
        self.check_writable()?;
        for replica in &mut self.replicas {
            for update in updates {
                replica.state.apply(update);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "replica_tests.rs"]
mod tests;
