// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

#[test]
fn acquire_writes_our_pid() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pg_autoctl.pid");

    let guard = PidGuard::acquire_as(path.clone(), 4242).unwrap();
    assert_eq!(guard.start_pid(), 4242);
    assert_eq!(
        std::fs::read_to_string(&path).unwrap().trim(),
        "4242"
    );
    guard.check().unwrap();
}

#[test]
fn second_keeper_is_refused() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pg_autoctl.pid");

    let _first = PidGuard::acquire_as(path.clone(), 100).unwrap();
    let err = PidGuard::acquire_as(path.clone(), 200).unwrap_err();
    assert!(matches!(err, KeeperError::PidConflict(_)));

    // The loser must not have wiped the owner's PID.
    assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "100");
}

#[test]
fn stolen_pid_file_fails_the_check() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pg_autoctl.pid");
    let guard = PidGuard::acquire_as(path.clone(), 100).unwrap();

    std::fs::write(&path, "999\n").unwrap();

    let err = guard.check().unwrap_err();
    assert!(matches!(err, KeeperError::PidConflict(_)));
    assert!(err.is_fatal());
    assert_eq!(err.exit_code(), pgk_core::exit_codes::QUIT);
}

#[test]
fn missing_pid_file_fails_the_check() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pg_autoctl.pid");
    let guard = PidGuard::acquire_as(path.clone(), 100).unwrap();

    std::fs::remove_file(&path).unwrap();

    assert!(matches!(
        guard.check(),
        Err(KeeperError::PidConflict(_))
    ));
}

#[test]
fn release_removes_the_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pg_autoctl.pid");
    let guard = PidGuard::acquire_as(path.clone(), 100).unwrap();

    guard.release();
    assert!(!path.exists());

    // A successor can now take over cleanly.
    let _next = PidGuard::acquire_as(path, 101).unwrap();
}
