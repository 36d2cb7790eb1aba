// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Primary signal state, its replicas, and the commit journal
//!
//! Every mutation goes through [`SignalStore::commit`], which writes the
//! replicas and the primary together. Callers hold the coordinator lock that
//! owns the fields being written; the store itself does no lock checking.

use crate::lock::HolderId;
use crate::replica::{ReplicaError, ReplicaSet};
use crate::signal::{FieldUpdate, SignalState};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// A committed fan-out write
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Monotonic commit number, starting at 1
    pub seq: u64,
    /// Holder label of the task that committed
    pub owner: String,
    pub updates: Vec<FieldUpdate>,
}

impl fmt::Display for Commit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:<4} {:<22}", self.seq, self.owner)?;
        for (i, update) in self.updates.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, " {}", update)?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct SignalStore {
    primary: SignalState,
    replicas: ReplicaSet,
    journal: VecDeque<Commit>,
    journal_limit: usize,
    next_seq: u64,
}

impl SignalStore {
    pub fn new(replica_count: usize, journal_limit: usize) -> Self {
        let primary = SignalState::default();
        Self {
            primary,
            replicas: ReplicaSet::new(replica_count, primary),
            journal: VecDeque::with_capacity(journal_limit),
            journal_limit,
            next_seq: 1,
        }
    }

    pub fn primary(&self) -> &SignalState {
        &self.primary
    }

    pub fn replicas(&self) -> &ReplicaSet {
        &self.replicas
    }

    pub fn set_replica_online(&mut self, index: usize, online: bool) -> Result<(), ReplicaError> {
        self.replicas.set_online(index, online)
    }

    /// Write `updates` to every replica and then to the primary
    ///
    /// Either everything is applied or nothing is.
    pub fn commit(
        &mut self,
        owner: &HolderId,
        updates: &[FieldUpdate],
    ) -> Result<u64, ReplicaError> {
        self.replicas.write(updates)?;
        for update in updates {
            self.primary.apply(update);
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        for update in updates {
            tracing::info!(%owner, seq, replicas = self.replicas.len(), "updating replicas: {}", update);
        }

        if self.journal_limit > 0 {
            if self.journal.len() == self.journal_limit {
                self.journal.pop_front();
            }
            self.journal.push_back(Commit {
                seq,
                owner: owner.to_string(),
                updates: updates.to_vec(),
            });
        }
        Ok(seq)
    }

    /// Retained commits, oldest first
    pub fn history(&self) -> Vec<Commit> {
        self.journal.iter().cloned().collect()
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
