// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::signal::{RoadGroup, SignalColor};

fn green_a() -> [FieldUpdate; 2] {
    SignalState::green_updates(RoadGroup::A)
}

#[test]
fn new_set_is_initialized_identically() {
    let set = ReplicaSet::new(3, SignalState::default());
    assert_eq!(set.len(), 3);
    assert!(set.is_consistent_with(&SignalState::default()));
}

#[test]
fn write_reaches_every_replica() {
    let mut set = ReplicaSet::new(3, SignalState::default());
    set.write(&green_a()).unwrap();

    for state in set.states() {
        assert_eq!(state.road_a, SignalColor::Green);
        assert_eq!(state.road_b, SignalColor::Red);
    }
}

#[test]
fn offline_replica_refuses_whole_write() {
    let mut set = ReplicaSet::new(3, SignalState::default());
    set.set_online(2, false).unwrap();

    let err = set.write(&green_a()).unwrap_err();

    assert_eq!(err, ReplicaError::Offline { index: 2 });
    // Nothing applied, not even to the replicas before the offline one
    assert!(set.is_consistent_with(&SignalState::default()));
}

#[test]
fn replica_accepts_writes_again_when_back_online() {
    let mut set = ReplicaSet::new(2, SignalState::default());
    set.set_online(0, false).unwrap();
    assert!(set.write(&green_a()).is_err());

    set.set_online(0, true).unwrap();
    set.write(&green_a()).unwrap();
    assert_eq!(set.states()[0].road_a, SignalColor::Green);
}

#[test]
fn set_online_out_of_range_fails() {
    let mut set = ReplicaSet::new(1, SignalState::default());
    assert_eq!(
        set.set_online(4, false),
        Err(ReplicaError::NoSuchReplica { index: 4, count: 1 })
    );
}
