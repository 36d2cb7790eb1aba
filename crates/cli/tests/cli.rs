// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI integration tests

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn tc() -> Command {
    let mut cmd = Command::cargo_bin("tc").unwrap();
    cmd.env_remove("TC_ADDR")
        .env_remove("TC_CONFIG")
        .env_remove("TC_PORT")
        .env_remove("TC_BIND");
    cmd
}

/// A localhost address with nothing listening on it
fn closed_addr() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);
    addr
}

fn write_config(dir: &Path, port: u16) -> PathBuf {
    let path = dir.join("tcd.toml");
    let content = format!(
        "state_dir = {:?}\nport = {}\n\n[coordinator]\namber_duration = \"100ms\"\nauto_start = false\n",
        dir.join("state").display().to_string(),
        port
    );
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn help_lists_commands() {
    tc().arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("manual"))
        .stdout(predicate::str::contains("pedestrian"))
        .stdout(predicate::str::contains("deadlock"))
        .stdout(predicate::str::contains("daemon"));
}

#[test]
fn invalid_road_is_rejected_before_connecting() {
    tc().args(["--addr", &closed_addr(), "manual", "--road", "north"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unrecognized road"));

    tc().args(["pedestrian", "7"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unrecognized road"));
}

#[test]
fn client_command_without_daemon_fails() {
    tc().args(["--addr", &closed_addr(), "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Daemon not running"));
}

#[test]
fn daemon_status_when_not_running() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), 0);

    tc().args(["--addr", &closed_addr(), "daemon", "--config"])
        .arg(&config)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Daemon not running"));

    tc().args(["--addr", &closed_addr(), "daemon", "--config"])
        .arg(&config)
        .arg("stop")
        .assert()
        .success()
        .stdout(predicate::str::contains("Daemon not running"));
}

#[test]
fn daemon_logs_without_log_file() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), 0);

    tc().args(["daemon", "--config"])
        .arg(&config)
        .args(["logs", "-n", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No log file"));
}

/// Full round trip through a real `tcd`; skipped when the daemon binary has
/// not been built alongside `tc`.
#[test]
fn daemon_round_trip() {
    let tcd = assert_cmd::cargo::cargo_bin("tcd");
    if !tcd.exists() {
        eprintln!("skipping: {} not built", tcd.display());
        return;
    }

    let temp = TempDir::new().unwrap();
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = write_config(temp.path(), port);
    let addr = format!("127.0.0.1:{}", port);

    let daemon = |sub: &str| {
        let mut cmd = tc();
        cmd.env("TC_DAEMON_BINARY", &tcd)
            .args(["daemon", "--config"])
            .arg(&config)
            .arg(sub);
        cmd
    };

    daemon("start")
        .assert()
        .success()
        .stdout(predicate::str::contains("Daemon started"));

    tc().args(["--addr", &addr, "--format", "json", "manual", "--road", "12"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"road_a\": \"GREEN\""))
        .stdout(predicate::str::contains("\"road_b\": \"RED\""));

    tc().args(["--addr", &addr, "pedestrian", "A"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pedestrian B: GREEN"));

    tc().args(["--addr", &addr, "pedestrian", "B"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not GREEN"));

    tc().args(["--addr", &addr, "history"])
        .assert()
        .success()
        .stdout(predicate::str::contains("road A = GREEN"));

    daemon("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Status: running"));

    daemon("stop")
        .assert()
        .success()
        .stdout(predicate::str::contains("Daemon stopped"));

    tc().args(["--addr", &addr, "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Daemon not running"));
}
