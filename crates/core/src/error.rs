// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors surfaced by coordinator operations

use crate::lock::LockError;
use crate::replica::ReplicaError;
use crate::signal::{InvalidTarget, RoadGroup};
use thiserror::Error;

/// Errors that can occur while running a coordinator operation
///
/// `InvalidTarget` is detected before any lock is taken. `TransitionFault`
/// and `LockTimeout` occur with a lock held or requested; the lock is always
/// released before the error reaches the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    #[error("lock misuse: {0}")]
    LockMisuse(LockError),

    #[error(transparent)]
    InvalidTarget(#[from] InvalidTarget),

    #[error("transition fault: {0}")]
    TransitionFault(#[from] ReplicaError),

    #[error("lock wait timed out: {0}")]
    LockTimeout(LockError),

    #[error("road group {0} is not GREEN")]
    GroupNotGreen(RoadGroup),

    #[error("deadlock demo is disabled by configuration")]
    DemoDisabled,
}

impl From<LockError> for CoordinatorError {
    fn from(e: LockError) -> Self {
        match e {
            LockError::NotOwner { .. } => CoordinatorError::LockMisuse(e),
            LockError::Timeout { .. } => CoordinatorError::LockTimeout(e),
        }
    }
}
