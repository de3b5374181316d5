// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

#[test]
fn marker_lifecycle() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pg_autoctl.init");

    assert!(!exists(&path));
    create(&path).unwrap();
    assert!(exists(&path));

    // The marker records who was initializing.
    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        contents.trim().parse::<u32>().unwrap(),
        std::process::id()
    );

    remove(&path).unwrap();
    assert!(!exists(&path));
}

#[test]
fn remove_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pg_autoctl.init");
    remove(&path).unwrap();
    remove(&path).unwrap();
}
