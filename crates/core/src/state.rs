// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted keeper state and the per-tick DTOs exchanged with the monitor.

use crate::error::KeeperError;
use crate::node_state::NodeState;
use serde::{Deserialize, Serialize};

/// Fixed width of the `sync_state` buffer in the on-disk record.
pub const SYNC_STATE_LEN: usize = 32;

/// The durable keeper record, persisted after every reconcile tick.
///
/// `pg_control_version` and `system_identifier` latch: once observed non-zero
/// they identify this data directory forever, and a different observation
/// means the state file no longer describes the cluster it sits next to.
/// Contact timestamps are epoch seconds and only ever move forward; zero
/// means "never".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeeperState {
    pub pg_version: u32,
    pub pg_control_version: u32,
    pub system_identifier: u64,
    pub current_node_id: i64,
    pub current_group: i64,
    pub current_role: NodeState,
    pub assigned_role: NodeState,
    pub last_monitor_contact: u64,
    pub last_secondary_contact: u64,
    pub xlog_lag_bytes: u64,
    pub pg_is_running: bool,
    pub sync_state: String,
}

impl Default for KeeperState {
    fn default() -> Self {
        Self {
            pg_version: 0,
            pg_control_version: 0,
            system_identifier: 0,
            current_node_id: -1,
            current_group: -1,
            current_role: NodeState::Init,
            assigned_role: NodeState::Init,
            last_monitor_contact: 0,
            last_secondary_contact: 0,
            xlog_lag_bytes: 0,
            pg_is_running: false,
            sync_state: String::new(),
        }
    }
}

impl KeeperState {
    /// Record a successful monitor round-trip. Never moves the clock back.
    pub fn observe_monitor_contact(&mut self, now: u64) {
        self.last_monitor_contact = self.last_monitor_contact.max(now);
    }

    /// Record evidence of a connected standby. Never moves the clock back.
    pub fn observe_secondary_contact(&mut self, now: u64) {
        self.last_secondary_contact = self.last_secondary_contact.max(now);
    }

    /// Latch control-file identity from a probe.
    ///
    /// A non-zero stored value that disagrees with the probe means this state
    /// file belongs to a different cluster.
    pub fn latch_control_data(
        &mut self,
        pg_control_version: u32,
        system_identifier: u64,
    ) -> Result<(), KeeperError> {
        if self.pg_control_version != 0 && pg_control_version != 0
            && self.pg_control_version != pg_control_version
        {
            return Err(KeeperError::StateCorrupt(format!(
                "pg_control_version changed from {} to {}",
                self.pg_control_version, pg_control_version
            )));
        }
        if self.system_identifier != 0 && system_identifier != 0
            && self.system_identifier != system_identifier
        {
            return Err(KeeperError::StateCorrupt(format!(
                "system_identifier changed from {} to {}",
                self.system_identifier, system_identifier
            )));
        }
        if pg_control_version != 0 {
            self.pg_control_version = pg_control_version;
        }
        if system_identifier != 0 {
            self.system_identifier = system_identifier;
        }
        Ok(())
    }
}

/// One keeper report to the monitor, sent on every tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeActiveReport {
    pub formation: String,
    pub nodename: String,
    pub pgport: u16,
    pub node_id: i64,
    pub group_id: i64,
    pub current_role: NodeState,
    pub pg_is_running: bool,
    pub wal_lag_bytes: u64,
    pub sync_state: String,
}

/// The monitor's answer to a report (or to a registration).
///
/// The peer endpoint names the other node of the group when the monitor
/// knows one: the primary to replicate from (or rewind against) when this
/// node is a standby, the standby to open access for when it is a primary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorAssignment {
    pub assigned_state: NodeState,
    pub node_id: i64,
    pub group_id: i64,
    pub peer_host: Option<String>,
    pub peer_port: Option<u16>,
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
