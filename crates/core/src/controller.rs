// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signal and pedestrian controllers
//!
//! A cycle takes the signal lock, runs the amber phase if needed, switches
//! the groups, then takes the pedestrian lock for the crossings while still
//! holding the signal lock. Locks are always taken in the order
//! signal -> pedestrian on this path.

use crate::clock::Clock;
use crate::coordinator::{Coordinator, CycleOrigin};
use crate::error::CoordinatorError;
use crate::lock::{HolderId, LockGuard, LockId};
use crate::signal::{RoadGroup, SignalColor, SignalState};
use crate::status::StatusSnapshot;
use tracing::Instrument;

/// Owner label for pedestrian updates requested directly
pub const PEDESTRIAN_OWNER: &str = "pedestrian_controller";

impl<C: Clock> Coordinator<C> {
    /// Turn `target` GREEN and the other group RED, then update the crossings
    ///
    /// The amber wait happens with the signal lock held, so a concurrent
    /// cycle cannot interleave its writes with this one. Any failure releases
    /// every lock taken before it is returned.
    pub async fn run_cycle(
        &self,
        target: RoadGroup,
        origin: CycleOrigin,
    ) -> Result<StatusSnapshot, CoordinatorError> {
        let owner = origin.holder();
        let span = tracing::info_span!("signal.cycle", %target, %owner);

        async move {
            let _signal = self.lock(LockId::Signal, owner.clone()).await?;

            if let Some(amber) = self.signals().amber_update(target) {
                self.commit(&owner, &[amber])?;
                tokio::time::sleep(self.inner.config.amber_duration).await;
            }

            self.commit(&owner, &SignalState::green_updates(target))?;
            *self.road_to_green() = Some(target);

            self.update_pedestrians(target, &owner).await?;

            tracing::info!("cycle complete");
            Ok(self.status())
        }
        .instrument(span)
        .await
    }

    /// Set the crossings complementary to `group`, which must be GREEN
    pub async fn update_for_group(
        &self,
        group: RoadGroup,
    ) -> Result<StatusSnapshot, CoordinatorError> {
        let owner = HolderId::new(PEDESTRIAN_OWNER);
        self.update_pedestrians(group, &owner)
            .instrument(tracing::info_span!("pedestrian.update", %group))
            .await?;
        Ok(self.status())
    }

    async fn update_pedestrians(
        &self,
        group: RoadGroup,
        owner: &HolderId,
    ) -> Result<(), CoordinatorError> {
        let _pedestrian = self.lock(LockId::Pedestrian, owner.clone()).await?;

        if self.signals().road(group) != SignalColor::Green {
            return Err(CoordinatorError::GroupNotGreen(group));
        }
        self.commit(owner, &SignalState::pedestrian_updates(group))?;
        Ok(())
    }

    /// Take a lock, bounded by `acquire_timeout` when safe mode is on
    async fn lock(
        &self,
        id: LockId,
        holder: HolderId,
    ) -> Result<LockGuard<'_, C>, CoordinatorError> {
        match self.inner.config.acquire_timeout {
            Some(timeout) => Ok(self.inner.locks.lock_timeout(id, holder, timeout).await?),
            None => Ok(self.inner.locks.lock(id, holder).await),
        }
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
