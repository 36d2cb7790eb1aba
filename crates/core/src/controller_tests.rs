// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::FakeClock;
use crate::config::CoordinatorConfig;
use crate::lock::LockError;
use crate::picker::SequencePicker;
use crate::signal::{FieldUpdate, PedestrianColor};
use std::time::Duration;
use tokio::time::Instant;

fn coordinator_with(config: CoordinatorConfig) -> Coordinator<FakeClock> {
    Coordinator::with_parts(
        config,
        FakeClock::new(),
        Box::new(SequencePicker::new([RoadGroup::A])),
    )
    .unwrap()
}

fn coordinator() -> Coordinator<FakeClock> {
    coordinator_with(CoordinatorConfig::default())
}

#[tokio::test(start_paused = true)]
async fn cycle_to_green_group_skips_amber() {
    let coordinator = coordinator();
    let start = Instant::now();

    coordinator
        .run_cycle(RoadGroup::B, CycleOrigin::Manual)
        .await
        .unwrap();

    assert_eq!(start.elapsed(), Duration::ZERO);
    let history = coordinator.history();
    assert_eq!(history.len(), 2);
    assert!(history
        .iter()
        .flat_map(|c| &c.updates)
        .all(|u| !matches!(u, FieldUpdate::Road { color: SignalColor::Yellow, .. })));
}

#[tokio::test(start_paused = true)]
async fn cycle_holds_amber_under_signal_lock() {
    let coordinator = coordinator();
    let start = Instant::now();

    let cycle = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            coordinator
                .run_cycle(RoadGroup::A, CycleOrigin::Manual)
                .await
        })
    };
    tokio::time::sleep(Duration::from_secs(1)).await;

    let mid = coordinator.status();
    assert_eq!(mid.road_a, SignalColor::Yellow);
    assert_eq!(mid.road_b, SignalColor::Green);
    assert_eq!(mid.lock_owner, Some(HolderId::new("manual")));
    assert!(mid.signal_locked);
    assert!(mid.replicas_consistent());

    let status = cycle.await.unwrap().unwrap();
    assert!(start.elapsed() >= Duration::from_secs(2));
    assert_eq!(status.road_a, SignalColor::Green);
    assert_eq!(status.road_b, SignalColor::Red);
}

#[tokio::test(start_paused = true)]
async fn signal_writes_precede_pedestrian_writes() {
    let coordinator = coordinator();
    coordinator
        .run_cycle(RoadGroup::A, CycleOrigin::Manual)
        .await
        .unwrap();

    let updates: Vec<_> = coordinator
        .history()
        .into_iter()
        .map(|c| c.updates)
        .collect();
    assert_eq!(
        updates,
        vec![
            vec![FieldUpdate::Road {
                group: RoadGroup::A,
                color: SignalColor::Yellow
            }],
            SignalState::green_updates(RoadGroup::A).to_vec(),
            SignalState::pedestrian_updates(RoadGroup::A).to_vec(),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn update_for_green_group_sets_complementary_crossings() {
    let coordinator = coordinator();
    let status = coordinator.update_for_group(RoadGroup::B).await.unwrap();

    assert_eq!(status.pedestrian_b, PedestrianColor::Red);
    assert_eq!(status.pedestrian_a, PedestrianColor::Green);
    let history = coordinator.history();
    assert_eq!(history[0].owner, PEDESTRIAN_OWNER);
}

#[tokio::test]
async fn update_for_red_group_is_rejected_and_releases_lock() {
    let coordinator = coordinator();

    let err = coordinator
        .update_for_group(RoadGroup::A)
        .await
        .unwrap_err();

    assert_eq!(err, CoordinatorError::GroupNotGreen(RoadGroup::A));
    assert!(!coordinator.locks().is_held(LockId::Pedestrian));
    assert_eq!(coordinator.signals(), SignalState::default());
}

#[tokio::test(start_paused = true)]
async fn concurrent_cycles_do_not_interleave() {
    let coordinator = coordinator();

    let manual = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            coordinator
                .run_cycle(RoadGroup::A, CycleOrigin::Manual)
                .await
        })
    };
    let auto = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            coordinator
                .run_cycle(RoadGroup::B, CycleOrigin::Automatic)
                .await
        })
    };
    manual.await.unwrap().unwrap();
    auto.await.unwrap().unwrap();

    // Each cycle's commits form one contiguous run in the journal
    let mut owners: Vec<String> = coordinator
        .history()
        .into_iter()
        .map(|c| c.owner)
        .collect();
    owners.dedup();
    assert_eq!(owners.len(), 2, "cycles interleaved: {:?}", owners);

    let state = coordinator.signals();
    assert!(state.is_settled());
    assert!(state.pedestrians_consistent());
    assert!(coordinator.status().replicas_consistent());
}

#[tokio::test(start_paused = true)]
async fn cycle_waits_for_pedestrian_lock() {
    let coordinator = coordinator();
    let other = HolderId::new("other");
    coordinator
        .locks()
        .acquire(LockId::Pedestrian, &other)
        .await;

    let cycle = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            coordinator
                .run_cycle(RoadGroup::A, CycleOrigin::Manual)
                .await
        })
    };
    tokio::time::sleep(Duration::from_secs(5)).await;

    // Signals switched, crossings pending, both locks held
    let mid = coordinator.status();
    assert_eq!(mid.road_a, SignalColor::Green);
    assert_eq!(mid.pedestrian_a, PedestrianColor::Green);
    assert!(mid.signal_locked && mid.pedestrian_locked);
    assert_eq!(
        coordinator.locks().waiters(LockId::Pedestrian),
        vec![HolderId::new("manual")]
    );

    coordinator
        .locks()
        .release(LockId::Pedestrian, &other)
        .unwrap();
    let status = cycle.await.unwrap().unwrap();
    assert!(status.signals().pedestrians_consistent());
}

#[tokio::test(start_paused = true)]
async fn queued_manual_cycle_is_not_a_wait_for_cycle() {
    let coordinator = coordinator();
    let cycles: Vec<_> = [RoadGroup::A, RoadGroup::A]
        .into_iter()
        .map(|target| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.run_cycle(target, CycleOrigin::Manual).await })
        })
        .collect();
    tokio::time::sleep(Duration::from_millis(500)).await;

    // One manual cycle is in amber, the other waits on the signal lock
    assert_eq!(
        coordinator.locks().waiters(LockId::Signal),
        vec![HolderId::new("manual")]
    );
    assert_eq!(coordinator.locks().wait_for_cycle(), None);

    for cycle in cycles {
        cycle.await.unwrap().unwrap();
    }
    assert!(coordinator.signals().is_settled());
}

#[tokio::test(start_paused = true)]
async fn safe_mode_times_out_without_touching_state() {
    let coordinator =
        coordinator_with(CoordinatorConfig::default().with_acquire_timeout(Duration::from_secs(1)));
    let other = HolderId::new("other");
    coordinator.locks().acquire(LockId::Signal, &other).await;

    let err = coordinator
        .run_cycle(RoadGroup::A, CycleOrigin::Manual)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CoordinatorError::LockTimeout(LockError::Timeout { lock: LockId::Signal, .. })
    ));
    assert_eq!(coordinator.signals(), SignalState::default());
    assert_eq!(coordinator.locks().holder(LockId::Signal), Some(other));
}

#[tokio::test(start_paused = true)]
async fn replicas_match_primary_after_every_cycle() {
    let coordinator = coordinator_with(CoordinatorConfig::default().with_replica_count(5));

    for target in [RoadGroup::A, RoadGroup::A, RoadGroup::B, RoadGroup::A] {
        let status = coordinator
            .run_cycle(target, CycleOrigin::Manual)
            .await
            .unwrap();
        assert_eq!(status.replicas.len(), 5);
        assert!(status.replicas_consistent());
        assert!(status.signals().is_settled());
        assert_eq!(status.signals().green_group(), Some(target));
    }
}
