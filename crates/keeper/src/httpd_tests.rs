// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pgk_core::{KeeperState, NodeState};
use std::path::Path;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

fn ctx_in(dir: &Path) -> RequestCtx {
    RequestCtx {
        config_path: dir.join("pg_autoctl.cfg"),
        state_path: dir.join("pg_autoctl.state"),
    }
}

fn write_fixtures(dir: &Path, role: NodeKind) -> RequestCtx {
    let ctx = ctx_in(dir);
    let mut config = KeeperConfig::seed(
        dir.to_path_buf(),
        "default".to_string(),
        "node-a.example".to_string(),
        "postgres://autoctl@monitor.example/pg_auto_failover".to_string(),
    );
    config.pg_autoctl.role = role;
    config.save(&ctx.config_path).unwrap();

    let state = KeeperState {
        current_role: NodeState::Primary,
        assigned_role: NodeState::Primary,
        current_node_id: 2,
        current_group: 0,
        pg_is_running: true,
        sync_state: "sync".to_string(),
        ..KeeperState::default()
    };
    StateStore::new(&ctx.state_path).write(&state).unwrap();
    ctx
}

#[test]
fn root_says_hello() {
    let dir = TempDir::new().unwrap();
    let response = dispatch(&routes(), "/", &ctx_in(dir.path()));
    assert_eq!(response.status, 200);
    assert_eq!(response.body, "Hello, world!\n");
}

#[test]
fn versions_has_three_lines() {
    let dir = TempDir::new().unwrap();
    let response = dispatch(&routes(), "/versions", &ctx_in(dir.path()));
    assert_eq!(response.status, 200);
    assert_eq!(response.body.lines().count(), 3);
    assert!(response.body.contains(version::API_VERSION));
}

#[test]
fn liveness_answers_ok() {
    let dir = TempDir::new().unwrap();
    let response = dispatch(&routes(), "/1.0/state", &ctx_in(dir.path()));
    assert_eq!(response.status, 200);
    assert_eq!(response.body, "Ok\n");
}

#[test]
fn unknown_path_is_404() {
    let dir = TempDir::new().unwrap();
    let response = dispatch(&routes(), "/2.0/anything", &ctx_in(dir.path()));
    assert_eq!(response.status, 404);
}

// A row without a handler must not stop the scan: a later row for the same
// path still answers.
#[test]
fn dispatch_scans_past_unhandled_rows() {
    let dir = TempDir::new().unwrap();
    let table = vec![
        Route {
            path: "/ping",
            handler: None,
        },
        Route {
            path: "/ping",
            handler: Some(liveness),
        },
    ];
    let response = dispatch(&table, "/ping", &ctx_in(dir.path()));
    assert_eq!(response.status, 200);
    assert_eq!(response.body, "Ok\n");
}

#[test]
fn unhandled_row_alone_is_a_404_after_full_scan() {
    let dir = TempDir::new().unwrap();
    let table = vec![Route {
        path: "/ping",
        handler: None,
    }];
    let response = dispatch(&table, "/ping", &ctx_in(dir.path()));
    assert_eq!(response.status, 404);
}

#[test]
fn fsm_state_reports_roles_and_ids() {
    let dir = TempDir::new().unwrap();
    let ctx = write_fixtures(dir.path(), NodeKind::Keeper);

    let response = dispatch(&routes(), "/1.0/fsm/state", &ctx);
    assert_eq!(response.status, 200);

    let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(body["fsm"]["current_role"], "primary");
    assert_eq!(body["fsm"]["assigned_role"], "primary");
    assert_eq!(body["monitor"]["current_node_id"], 2);
    assert_eq!(body["monitor"]["current_group"], 0);
    assert_eq!(body["postgres"]["pg_is_running"], true);
    assert_eq!(body["postgres"]["sync_state"], "sync");
}

#[test]
fn fsm_state_on_a_monitor_node_is_503() {
    let dir = TempDir::new().unwrap();
    let ctx = write_fixtures(dir.path(), NodeKind::Monitor);

    let response = dispatch(&routes(), "/1.0/fsm/state", &ctx);
    assert_eq!(response.status, 503);
}

// A failed state read must produce the fixed error JSON, never garbage.
#[test]
fn fsm_state_read_failure_returns_error_json() {
    let dir = TempDir::new().unwrap();
    let ctx = write_fixtures(dir.path(), NodeKind::Keeper);
    std::fs::write(&ctx.state_path, b"torn").unwrap();

    let response = dispatch(&routes(), "/1.0/fsm/state", &ctx);
    assert_eq!(response.status, 500);
    let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
    assert!(body["error"].as_str().unwrap().contains("bytes"));
}

#[test]
fn request_line_parsing() {
    assert_eq!(
        parse_request_line("GET /1.0/state HTTP/1.1\r\nHost: x\r\n\r\n"),
        Some(("GET", "/1.0/state"))
    );
    assert_eq!(parse_request_line(""), None);
    assert_eq!(parse_request_line("GET"), None);
}

#[tokio::test]
async fn end_to_end_get_over_tcp() {
    let dir = TempDir::new().unwrap();
    let ctx = write_fixtures(dir.path(), NodeKind::Keeper);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve_on(listener, ctx));

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /1.0/state HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();

    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();
    assert!(raw.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(raw.ends_with("Ok\n"));
}

#[tokio::test]
async fn post_is_rejected_with_405() {
    let dir = TempDir::new().unwrap();
    let ctx = write_fixtures(dir.path(), NodeKind::Keeper);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve_on(listener, ctx));

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"POST / HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\n\r\n")
        .await
        .unwrap();

    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();
    assert!(raw.starts_with("HTTP/1.1 405"));
}
