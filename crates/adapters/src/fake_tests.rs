// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::pg::PgController;

#[tokio::test]
async fn fake_pg_models_start_and_stop() {
    let pg = FakePgController::new();
    assert!(!pg.is_running().await.unwrap());

    pg.start().await.unwrap();
    assert!(pg.is_running().await.unwrap());

    pg.stop().await.unwrap();
    assert!(!pg.is_running().await.unwrap());
    assert!(pg.called("start"));
    assert!(pg.called("stop"));
}

#[tokio::test]
async fn fake_pg_injected_failure_only_hits_named_op() {
    let pg = FakePgController::new();
    pg.fail_on("promote");

    assert!(pg.promote().await.is_err());
    assert!(pg.start().await.is_ok());

    pg.clear_failures();
    assert!(pg.promote().await.is_ok());
}

#[tokio::test]
async fn fake_monitor_replays_script_then_echoes() {
    let monitor = FakeMonitorClient::new();
    monitor.push_assignment(NodeState::WaitPrimary);
    monitor.push_error("network down");

    let report = NodeActiveReport {
        formation: "default".to_string(),
        nodename: "node-a".to_string(),
        pgport: 5432,
        node_id: 1,
        group_id: 0,
        current_role: NodeState::Single,
        pg_is_running: true,
        wal_lag_bytes: 0,
        sync_state: String::new(),
    };

    let first = monitor.node_active(&report).await.unwrap();
    assert_eq!(first.assigned_state, NodeState::WaitPrimary);

    assert!(monitor.node_active(&report).await.is_err());

    // Script dry: the reported role comes back as the assignment.
    let third = monitor.node_active(&report).await.unwrap();
    assert_eq!(third.assigned_state, NodeState::Single);

    assert_eq!(monitor.reports().len(), 3);
}
