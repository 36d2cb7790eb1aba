// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for daemon client behavior.

use super::*;
use tempfile::tempdir;
use tokio::net::TcpListener;

/// An address nothing is listening on
async fn closed_addr() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);
    addr
}

/// Serve exactly one request with a fixed response
async fn one_shot_server(response: Response) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (mut reader, mut writer) = stream.into_split();
        protocol::read_message(&mut reader).await.unwrap();
        let data = protocol::encode(&response).unwrap();
        protocol::write_message(&mut writer, &data).await.unwrap();
    });
    addr
}

/// Serve one request per response in order, returning the requests seen
async fn scripted_server(
    responses: Vec<Response>,
) -> (String, tokio::task::JoinHandle<Vec<Request>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let handle = tokio::spawn(async move {
        let mut seen = Vec::new();
        for response in responses {
            let (stream, _) = listener.accept().await.unwrap();
            let (mut reader, mut writer) = stream.into_split();
            let bytes = protocol::read_message(&mut reader).await.unwrap();
            let request: Request = protocol::decode(&bytes).unwrap();
            seen.push(request);
            let data = protocol::encode(&response).unwrap();
            protocol::write_message(&mut writer, &data).await.unwrap();
        }
        seen
    });
    (addr, handle)
}

#[tokio::test]
async fn refused_connection_means_not_running() {
    let client = DaemonClient::new(closed_addr().await);
    assert!(matches!(
        client.status().await,
        Err(ClientError::DaemonNotRunning)
    ));
}

#[tokio::test]
async fn stop_when_not_running_reports_false() {
    let dir = tempdir().unwrap();
    let pid_path = dir.path().join("tcd.pid");
    std::fs::write(&pid_path, "12345\n").unwrap();

    let client = DaemonClient::new(closed_addr().await);
    assert!(!daemon_stop(&client, &pid_path).await.unwrap());
    // Never touches a PID file it did not act on
    assert!(pid_path.exists());
}

#[tokio::test]
async fn error_response_becomes_rejected() {
    let addr = one_shot_server(Response::Error {
        message: "road group A is not GREEN".to_string(),
    })
    .await;

    let err = DaemonClient::new(addr)
        .pedestrian(RoadGroup::A)
        .await
        .unwrap_err();

    match err {
        ClientError::Rejected(message) => assert!(message.contains("not GREEN")),
        other => panic!("expected Rejected, got {:?}", other),
    }
}

#[tokio::test]
async fn mismatched_response_is_unexpected() {
    let addr = one_shot_server(Response::Pong).await;
    let err = DaemonClient::new(addr).history().await.unwrap_err();
    assert!(matches!(err, ClientError::UnexpectedResponse));
}

#[test]
fn startup_error_is_read_from_last_marker() {
    let log = format!(
        "{p}100)\nERROR Failed to start daemon: old failure\n\
         {p}200)\n2026-01-01T00:00:00Z  INFO tcd: Starting tcd on 127.0.0.1:3000\n\
         ERROR Failed to start daemon: Failed to bind 127.0.0.1:3000: Address in use\n",
        p = STARTUP_MARKER_PREFIX
    );

    let err = startup_error_in(&log).unwrap();

    assert!(err.contains("Address in use"), "{}", err);
    assert!(!err.contains("old failure"), "{}", err);
}

#[test]
fn clean_startup_has_no_error() {
    let log = format!("{}42)\n INFO tcd: Daemon ready\n", STARTUP_MARKER_PREFIX);
    assert_eq!(startup_error_in(&log), None);
    assert_eq!(startup_error_in("no marker here"), None);
}

#[test]
fn pid_file_parsing() {
    let dir = tempdir().unwrap();
    let pid_path = dir.path().join("tcd.pid");

    assert_eq!(read_daemon_pid(&pid_path), None);
    std::fs::write(&pid_path, "4242\n").unwrap();
    assert_eq!(read_daemon_pid(&pid_path), Some(4242));
    std::fs::write(&pid_path, "garbage").unwrap();
    assert_eq!(read_daemon_pid(&pid_path), None);
}

#[test]
fn cycle_timeout_covers_the_amber_phase() {
    let amber = Duration::from_secs(7);
    assert_eq!(timeout_cycle(amber), timeout_ipc() + amber);
    assert!(timeout_cycle(amber) > amber);
}

#[tokio::test]
async fn road_switch_asks_for_amber_before_sending() {
    let (addr, server) = scripted_server(vec![
        Response::Info {
            version: "0.1.0".to_string(),
            uptime_secs: 1,
            replica_count: 3,
            amber_ms: 7000,
        },
        Response::Error {
            message: "auto mode is on".to_string(),
        },
    ])
    .await;

    let err = DaemonClient::new(addr)
        .manual(ManualCommand::switch_to("A"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Rejected(_)));

    let seen = server.await.unwrap();
    assert_eq!(
        seen,
        vec![
            Request::Info,
            Request::manual(ManualCommand::switch_to("A")),
        ]
    );
}
