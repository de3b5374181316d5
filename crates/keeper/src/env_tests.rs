// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial]
fn sleep_time_defaults_to_five_seconds() {
    std::env::remove_var("PG_AUTOCTL_KEEPER_SLEEP_TIME");
    assert_eq!(keeper_sleep_time(), Duration::from_secs(5));
}

#[test]
#[serial]
fn sleep_time_honors_override() {
    std::env::set_var("PG_AUTOCTL_KEEPER_SLEEP_TIME", "1");
    assert_eq!(keeper_sleep_time(), Duration::from_secs(1));
    std::env::remove_var("PG_AUTOCTL_KEEPER_SLEEP_TIME");
}

#[test]
#[serial]
fn garbage_override_falls_back_to_default() {
    std::env::set_var("PG_AUTOCTL_KEEPER_SLEEP_TIME", "soon");
    assert_eq!(keeper_sleep_time(), Duration::from_secs(5));
    std::env::remove_var("PG_AUTOCTL_KEEPER_SLEEP_TIME");
}
