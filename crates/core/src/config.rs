// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("replica_count must be at least 1")]
    NoReplicas,

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

/// Timing and sizing for a [`Coordinator`](crate::Coordinator)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoordinatorConfig {
    /// Number of in-memory replicas kept in lockstep with the primary
    pub replica_count: usize,
    /// How long a group shows YELLOW before turning GREEN
    #[serde(with = "humantime_serde")]
    pub amber_duration: Duration,
    /// Pause between automatic cycles
    #[serde(with = "humantime_serde")]
    pub cycle_interval: Duration,
    /// Delay between each demo task's first and second acquisition
    #[serde(with = "humantime_serde")]
    pub deadlock_hold: Duration,
    /// When the demo's diagnostic timer checks for completion
    #[serde(with = "humantime_serde")]
    pub deadlock_check: Duration,
    /// Whether the host process enables auto mode at startup
    pub auto_start: bool,
    /// Whether the deadlock demo may be triggered at all
    pub deadlock_demo: bool,
    /// Safe mode: bound controller lock waits. Unset means wait forever.
    #[serde(with = "humantime_serde")]
    pub acquire_timeout: Option<Duration>,
    /// Commits retained in the transition journal (0 disables it)
    pub history_limit: usize,
    /// Seed for the automatic target picker
    pub seed: Option<u64>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            replica_count: 3,
            amber_duration: Duration::from_secs(2),
            cycle_interval: Duration::from_secs(8),
            deadlock_hold: Duration::from_secs(1),
            deadlock_check: Duration::from_secs(5),
            auto_start: true,
            deadlock_demo: true,
            acquire_timeout: None,
            history_limit: 32,
            seed: None,
        }
    }
}

impl CoordinatorConfig {
    pub fn with_replica_count(mut self, count: usize) -> Self {
        self.replica_count = count;
        self
    }

    pub fn with_amber_duration(mut self, duration: Duration) -> Self {
        self.amber_duration = duration;
        self
    }

    pub fn with_cycle_interval(mut self, interval: Duration) -> Self {
        self.cycle_interval = interval;
        self
    }

    pub fn with_deadlock_timing(mut self, hold: Duration, check: Duration) -> Self {
        self.deadlock_hold = hold;
        self.deadlock_check = check;
        self
    }

    pub fn with_auto_start(mut self, enabled: bool) -> Self {
        self.auto_start = enabled;
        self
    }

    pub fn with_deadlock_demo(mut self, enabled: bool) -> Self {
        self.deadlock_demo = enabled;
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(timeout);
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.replica_count == 0 {
            return Err(ConfigError::NoReplicas);
        }
        if self.cycle_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("cycle_interval"));
        }
        if self.acquire_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::ZeroDuration("acquire_timeout"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
