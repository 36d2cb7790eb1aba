// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Automatic mode and the background cycle loop
//!
//! At most one loop task runs at a time. Turning auto mode off is observed
//! by the loop at its next iteration boundary; a cycle in flight completes.

use crate::clock::Clock;
use crate::coordinator::{Coordinator, CycleOrigin};
use std::sync::atomic::Ordering;
use tracing::Instrument;

impl<C: Clock> Coordinator<C> {
    /// Set auto mode; enabling it starts the loop unless one is running
    ///
    /// Must be called from within a tokio runtime.
    pub fn set_auto_mode(&self, enabled: bool) {
        let previous = self.inner.auto_mode.swap(enabled, Ordering::SeqCst);
        if previous != enabled {
            tracing::info!(auto = enabled, "auto mode changed");
        }
        if enabled {
            self.start_auto_loop();
        }
    }

    /// Number of loop tasks currently alive
    pub fn active_loops(&self) -> usize {
        self.inner.active_loops.load(Ordering::SeqCst)
    }

    /// Spawn the loop task if none is running; returns whether one was spawned
    fn start_auto_loop(&self) -> bool {
        if self
            .inner
            .loop_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        let coordinator = self.clone();
        tokio::spawn(
            async move { coordinator.auto_loop().await }
                .instrument(tracing::info_span!("auto_cycle")),
        );
        true
    }

    async fn auto_loop(self) {
        self.inner.active_loops.fetch_add(1, Ordering::SeqCst);
        tracing::info!(interval = ?self.inner.config.cycle_interval, "auto loop started");

        loop {
            if !self.auto_mode() {
                self.inner.loop_running.store(false, Ordering::SeqCst);
                // Auto mode re-enabled between the check and the store: the
                // enabler saw a running loop and spawned nothing, so carry on.
                if self.auto_mode()
                    && self
                        .inner
                        .loop_running
                        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                        .is_ok()
                {
                    continue;
                }
                break;
            }

            let target = self.inner.picker.pick();
            if let Err(e) = self.run_cycle(target, CycleOrigin::Automatic).await {
                tracing::warn!(%target, error = %e, "automatic cycle failed");
            }
            tokio::time::sleep(self.inner.config.cycle_interval).await;
        }

        self.inner.active_loops.fetch_sub(1, Ordering::SeqCst);
        tracing::info!("auto loop stopped");
    }
}

#[cfg(test)]
#[path = "auto_cycle_tests.rs"]
mod tests;
