// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn transition_failure() -> KeeperError {
    KeeperError::TransitionFailure {
        from: NodeState::Primary,
        to: NodeState::Draining,
        reason: "stop failed".to_string(),
    }
}

#[parameterized(
    config = { KeeperError::ConfigInvalid("x".into()), exit_codes::BAD_CONFIG },
    state = { KeeperError::StateCorrupt("x".into()), exit_codes::BAD_STATE },
    pid = { KeeperError::PidConflict("x".into()), exit_codes::QUIT },
    pgctl = { KeeperError::PgControllerFailure("x".into()), exit_codes::PGCTL },
    monitor = { KeeperError::MonitorUnreachable("x".into()), exit_codes::MONITOR },
    internal = { KeeperError::InternalError("x".into()), exit_codes::INTERNAL_ERROR },
)]
fn exit_code_mapping(err: KeeperError, code: i32) {
    assert_eq!(err.exit_code(), code);
}

#[test]
fn transition_failure_maps_to_bad_state() {
    assert_eq!(transition_failure().exit_code(), exit_codes::BAD_STATE);
}

#[test]
fn only_pid_conflict_and_internal_are_fatal() {
    assert!(KeeperError::PidConflict("stolen".into()).is_fatal());
    assert!(KeeperError::InternalError("bug".into()).is_fatal());

    assert!(!KeeperError::ConfigInvalid("x".into()).is_fatal());
    assert!(!KeeperError::StateCorrupt("x".into()).is_fatal());
    assert!(!KeeperError::PgControllerFailure("x".into()).is_fatal());
    assert!(!KeeperError::MonitorUnreachable("x".into()).is_fatal());
    assert!(!transition_failure().is_fatal());
}

#[test]
fn transition_failure_display_names_both_roles() {
    let msg = transition_failure().to_string();
    assert!(msg.contains("primary"));
    assert!(msg.contains("draining"));
}
