// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Opposite-order lock acquisition demo
//!
//! Two tasks take the coordinator's locks in opposite order with a delay in
//! between, so each ends up holding the lock the other waits on:
//!
//! - Task1: signal -> (hold) -> pedestrian
//! - Task2: pedestrian -> (hold) -> signal
//!
//! Mutual exclusion, hold-and-wait, no preemption and circular wait all hold,
//! and nothing ever breaks the cycle: the demo tasks and anything else that
//! needs either lock afterwards wait forever. Safe mode does not apply here.
//! A diagnostic timer reports the deadlock; it does not resolve it.

use crate::clock::Clock;
use crate::coordinator::Coordinator;
use crate::error::CoordinatorError;
use crate::lock::{HolderId, LockId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Status string of a freshly triggered demo
pub const DEADLOCK_TRIGGERED: &str = "DEADLOCK_TRIGGERED";

/// Returned immediately by [`Coordinator::trigger_deadlock`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlockReport {
    pub demo_id: Uuid,
    pub message: String,
    pub explanation: String,
    pub status: String,
}

/// Progress of the most recent demo
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoStatus {
    pub demo_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub task1_done: bool,
    pub task2_done: bool,
    /// Set by the diagnostic timer when it found both tasks still blocked
    pub confirmed: bool,
}

impl DemoStatus {
    pub fn is_deadlocked(&self) -> bool {
        !self.task1_done && !self.task2_done && self.confirmed
    }
}

impl fmt::Display for DemoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match (self.task1_done && self.task2_done, self.confirmed) {
            (true, _) => "completed",
            (false, true) => "deadlocked",
            (false, false) => "running",
        };
        write!(f, "{} {}", self.demo_id, state)
    }
}

pub(crate) struct DemoRun {
    id: Uuid,
    started_at: DateTime<Utc>,
    done: [AtomicBool; 2],
    confirmed: AtomicBool,
}

impl DemoRun {
    fn all_done(&self) -> bool {
        self.done.iter().all(|d| d.load(Ordering::SeqCst))
    }

    fn status(&self) -> DemoStatus {
        DemoStatus {
            demo_id: self.id,
            started_at: self.started_at,
            task1_done: self.done[0].load(Ordering::SeqCst),
            task2_done: self.done[1].load(Ordering::SeqCst),
            confirmed: self.confirmed.load(Ordering::SeqCst),
        }
    }
}

struct DemoTask {
    index: usize,
    label: &'static str,
    first: LockId,
    second: LockId,
}

static TASKS: [DemoTask; 2] = [
    DemoTask {
        index: 0,
        label: "Task1",
        first: LockId::Signal,
        second: LockId::Pedestrian,
    },
    DemoTask {
        index: 1,
        label: "Task2",
        first: LockId::Pedestrian,
        second: LockId::Signal,
    },
];

impl<C: Clock> Coordinator<C> {
    /// Start the deadlock demo and return without waiting for it
    ///
    /// Must be called from within a tokio runtime.
    pub fn trigger_deadlock(&self) -> Result<DeadlockReport, CoordinatorError> {
        if !self.inner.config.deadlock_demo {
            return Err(CoordinatorError::DemoDisabled);
        }

        let run = Arc::new(DemoRun {
            id: Uuid::new_v4(),
            started_at: self.inner.clock.utc_now(),
            done: [AtomicBool::new(false), AtomicBool::new(false)],
            confirmed: AtomicBool::new(false),
        });
        *self.inner.demo.lock().unwrap_or_else(|e| e.into_inner()) = Some(Arc::clone(&run));

        let span = tracing::warn_span!("deadlock.demo", demo_id = %run.id);
        span.in_scope(|| {
            tracing::warn!("triggering deadlock: Task1 takes signal then pedestrian, Task2 takes pedestrian then signal");
        });

        for task in &TASKS {
            let coordinator = self.clone();
            let run = Arc::clone(&run);
            tokio::spawn(
                async move { coordinator.demo_task(&run, task).await }
                    .instrument(tracing::warn_span!(parent: &span, "task", name = task.label)),
            );
        }

        let coordinator = self.clone();
        let diagnostic = Arc::clone(&run);
        tokio::spawn(
            async move { coordinator.check_deadlock(&diagnostic).await }.instrument(span),
        );

        Ok(DeadlockReport {
            demo_id: run.id,
            message: "Deadlock demo started; see the coordinator log for progress".to_string(),
            explanation: "Two tasks acquire the signal and pedestrian locks in opposite order, \
                          each holding one while waiting for the other (circular wait)"
                .to_string(),
            status: DEADLOCK_TRIGGERED.to_string(),
        })
    }

    /// Status of the most recent demo, if any
    pub fn demo_status(&self) -> Option<DemoStatus> {
        self.inner
            .demo
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|run| run.status())
    }

    async fn demo_task(&self, run: &DemoRun, task: &DemoTask) {
        let holder = HolderId::new(task.label);
        let locks = &self.inner.locks;

        locks.acquire(task.first, &holder).await;
        tracing::info!(holding = %task.first, next = %task.second, "got first lock");

        tokio::time::sleep(self.inner.config.deadlock_hold).await;

        tracing::warn!(waiting_for = %task.second, "waiting for second lock");
        locks.acquire(task.second, &holder).await;
        tracing::info!("got both locks, releasing");

        for id in [task.second, task.first] {
            if let Err(e) = locks.release(id, &holder) {
                tracing::warn!(error = %e, "demo release failed");
            }
        }
        run.done[task.index].store(true, Ordering::SeqCst);
    }

    async fn check_deadlock(&self, run: &DemoRun) {
        tokio::time::sleep(self.inner.config.deadlock_check).await;

        if run.all_done() {
            tracing::info!("demo tasks completed, no deadlock");
            return;
        }
        run.confirmed.store(true, Ordering::SeqCst);
        match self.inner.locks.wait_for_cycle() {
            Some(cycle) => {
                let names: Vec<_> = cycle.iter().map(|h| h.to_string()).collect();
                tracing::warn!(
                    cycle = %names.join(" -> "),
                    "deadlock confirmed: tasks are waiting on each other forever"
                );
            }
            None => tracing::warn!("demo tasks still blocked, no wait-for cycle among holders"),
        }
        tracing::warn!(
            "recovery would need lock timeouts, deadlock detection with victim \
             termination, or a single global lock order"
        );
    }
}

#[cfg(test)]
#[path = "deadlock_tests.rs"]
mod tests;
