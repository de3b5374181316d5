// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Partition detection for a primary that lost the monitor.
//!
//! The group policy authorizes the monitor plus any surviving standby to
//! promote a replacement once the partition timeout τ elapsed. A primary
//! that can see neither of them for longer than τ must therefore have
//! stepped down before the other side promotes, which is what keeps the
//! cluster at one primary.

use pgk_core::KeeperState;
use tracing::{info, warn};

/// Verdict for one failed-monitor tick on a primary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkHealth {
    /// A standby is connected; we are merely cut off from the monitor.
    Healthy,
    /// Nobody reachable, but the grace window τ has not elapsed on both
    /// fronts yet.
    WithinGrace,
    /// Bilateral unreachability past τ: the caller must demote.
    Partitioned,
}

/// Decide whether a primary that cannot reach the monitor sits in a true
/// partition.
///
/// `replica_connected` is the live `has_replica` probe result. A connected
/// standby refreshes `last_secondary_contact`, which is the only state this
/// check mutates.
pub fn evaluate(
    state: &mut KeeperState,
    now: u64,
    partition_timeout: u64,
    replica_connected: bool,
) -> NetworkHealth {
    if replica_connected {
        state.observe_secondary_contact(now);
        info!("monitor unreachable but a standby is connected, staying primary");
        return NetworkHealth::Healthy;
    }

    let monitor_lag = now.saturating_sub(state.last_monitor_contact);
    let secondary_lag = now.saturating_sub(state.last_secondary_contact);

    if state.last_monitor_contact > 0
        && state.last_secondary_contact > 0
        && monitor_lag > partition_timeout
        && secondary_lag > partition_timeout
    {
        warn!(
            monitor_lag,
            secondary_lag,
            partition_timeout,
            "network partition detected, demoting ourselves"
        );
        return NetworkHealth::Partitioned;
    }

    info!(
        monitor_lag,
        secondary_lag,
        partition_timeout,
        "monitor unreachable, staying primary within the grace window"
    );
    NetworkHealth::WithinGrace
}

#[cfg(test)]
#[path = "partition_tests.rs"]
mod tests;
