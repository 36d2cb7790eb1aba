// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn defaults_match_reference_timings() {
    let config = CoordinatorConfig::default();
    assert_eq!(config.replica_count, 3);
    assert_eq!(config.amber_duration, Duration::from_millis(2000));
    assert_eq!(config.cycle_interval, Duration::from_millis(8000));
    assert_eq!(config.deadlock_hold, Duration::from_millis(1000));
    assert_eq!(config.deadlock_check, Duration::from_millis(5000));
    assert!(config.acquire_timeout.is_none());
    assert!(config.validate().is_ok());
}

#[test]
fn partial_config_fills_in_defaults() {
    let config: CoordinatorConfig = serde_json::from_str(
        r#"{ "replica_count": 5, "amber_duration": "500ms", "acquire_timeout": "3s" }"#,
    )
    .unwrap();

    assert_eq!(config.replica_count, 5);
    assert_eq!(config.amber_duration, Duration::from_millis(500));
    assert_eq!(config.acquire_timeout, Some(Duration::from_secs(3)));
    assert_eq!(config.cycle_interval, Duration::from_secs(8));
}

#[test]
fn unknown_keys_are_rejected() {
    let result: Result<CoordinatorConfig, _> =
        serde_json::from_str(r#"{ "replicas": 5 }"#);
    assert!(result.is_err());
}

#[test]
fn zero_replicas_is_invalid() {
    let config = CoordinatorConfig::default().with_replica_count(0);
    assert_eq!(config.validate(), Err(ConfigError::NoReplicas));
}

#[test]
fn zero_cycle_interval_is_invalid() {
    let config = CoordinatorConfig::default().with_cycle_interval(Duration::ZERO);
    assert_eq!(
        config.validate(),
        Err(ConfigError::ZeroDuration("cycle_interval"))
    );
}
