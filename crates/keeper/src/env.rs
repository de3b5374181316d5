// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the keeper.

use std::time::Duration;

/// Seconds between reconcile ticks, configurable via
/// `PG_AUTOCTL_KEEPER_SLEEP_TIME` (default: 5s).
pub fn keeper_sleep_time() -> Duration {
    std::env::var("PG_AUTOCTL_KEEPER_SLEEP_TIME")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(5))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
