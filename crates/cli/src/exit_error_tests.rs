// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn keeper_errors_keep_their_exit_codes() {
    let err: ExitError = KeeperError::ConfigInvalid("broken".to_string()).into();
    assert_eq!(err.code, exit_codes::BAD_CONFIG);
    assert!(err.message.contains("broken"));
}

#[test]
fn sql_failures_map_to_pgsql_and_the_rest_to_pgctl() {
    let sql: ExitError = PgError::Sql {
        query: "SELECT 1".to_string(),
        detail: "boom".to_string(),
    }
    .into();
    assert_eq!(sql.code, exit_codes::PGSQL);

    let ctl: ExitError = PgError::Ctl {
        command: "pg_ctl start".to_string(),
        detail: "boom".to_string(),
    }
    .into();
    assert_eq!(ctl.code, exit_codes::PGCTL);
}

#[test]
fn monitor_failures_map_to_monitor() {
    let err: ExitError = MonitorError("down".to_string()).into();
    assert_eq!(err.code, exit_codes::MONITOR);
}

#[test]
fn corrupt_state_maps_to_bad_state() {
    let err: ExitError = StateStoreError::UnsupportedVersion(9).into();
    assert_eq!(err.code, exit_codes::BAD_STATE);
}
