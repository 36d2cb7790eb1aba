// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::FakeClock;
use crate::config::CoordinatorConfig;
use crate::coordinator::ManualCommand;
use crate::picker::SequencePicker;
use crate::signal::{RoadGroup, SignalColor};
use std::time::Duration;

fn coordinator(targets: &[RoadGroup]) -> Coordinator<FakeClock> {
    Coordinator::with_parts(
        CoordinatorConfig::default(),
        FakeClock::new(),
        Box::new(SequencePicker::new(targets.to_vec())),
    )
    .unwrap()
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[tokio::test(start_paused = true)]
async fn enabling_auto_starts_one_loop() {
    let coordinator = coordinator(&[RoadGroup::A]);

    coordinator.set_auto_mode(true);
    coordinator.set_auto_mode(true);
    coordinator
        .set_manual(ManualCommand::auto(true))
        .await
        .unwrap();
    settle().await;

    assert!(coordinator.auto_mode());
    assert!(coordinator.loop_running());
    assert_eq!(coordinator.active_loops(), 1);
}

#[tokio::test(start_paused = true)]
async fn loop_cycles_with_picked_targets() {
    let coordinator = coordinator(&[RoadGroup::A, RoadGroup::B]);
    coordinator.set_auto_mode(true);

    // First cycle: amber then A GREEN; then one interval before B
    tokio::time::sleep(Duration::from_secs(9)).await;
    let status = coordinator.status();
    assert_eq!(status.road_a, SignalColor::Green);
    assert_eq!(status.road_to_green, Some(RoadGroup::A));

    tokio::time::sleep(Duration::from_secs(4)).await;
    let status = coordinator.status();
    assert_eq!(status.road_b, SignalColor::Green);
    assert!(status.signals().pedestrians_consistent());

    assert!(coordinator
        .history()
        .iter()
        .all(|commit| commit.owner == "auto-cycle"));
    coordinator.set_auto_mode(false);
}

#[tokio::test(start_paused = true)]
async fn disabling_auto_lets_the_cycle_finish_then_stops() {
    let coordinator = coordinator(&[RoadGroup::A]);
    coordinator.set_auto_mode(true);
    settle().await;
    assert_eq!(coordinator.signals().road_a, SignalColor::Yellow);

    coordinator.set_auto_mode(false);
    assert!(!coordinator.auto_mode());

    // The in-flight cycle completes
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(coordinator.signals().road_a, SignalColor::Green);

    // The loop notices at its next boundary
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(!coordinator.loop_running());
    assert_eq!(coordinator.active_loops(), 0);
    let commits = coordinator.history().len();

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(coordinator.history().len(), commits);
}

#[tokio::test(start_paused = true)]
async fn quick_toggle_keeps_a_single_loop() {
    let coordinator = coordinator(&[RoadGroup::A, RoadGroup::B]);

    coordinator.set_auto_mode(true);
    settle().await;
    coordinator.set_auto_mode(false);
    coordinator.set_auto_mode(true);

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert!(coordinator.loop_running());
    assert_eq!(coordinator.active_loops(), 1);
    coordinator.set_auto_mode(false);
}

#[tokio::test(start_paused = true)]
async fn signal_controller_runs_a_cycle_in_auto_mode() {
    let coordinator = coordinator(&[RoadGroup::B]);
    coordinator.set_auto_mode(true);
    settle().await;

    // Loop picked B (already GREEN); an explicit request for A follows it
    let status = coordinator
        .signal_controller(Some(RoadGroup::A))
        .await
        .unwrap();
    assert_eq!(status.road_a, SignalColor::Green);
    assert_eq!(status.lock_owner, Some(crate::lock::HolderId::new("auto-cycle")));
    coordinator.set_auto_mode(false);
}

#[tokio::test(start_paused = true)]
async fn shutdown_turns_auto_mode_off() {
    let coordinator = coordinator(&[RoadGroup::A]);
    coordinator.set_auto_mode(true);
    coordinator.shutdown();
    assert!(!coordinator.auto_mode());

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert!(!coordinator.loop_running());
}
