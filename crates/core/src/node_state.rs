// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node roles recognized by the keeper state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a node in a formation.
///
/// The monitor assigns one of these to every registered node; the keeper's
/// job is to converge `current_role` onto the assignment. Each variant has a
/// stable wire tag used by the on-disk state record, so variants must never
/// be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Node registered, nothing initialized yet.
    Init,
    /// Sole node of its group, no replication configured.
    Single,
    /// Primary-to-be, waiting for a standby to finish its base backup.
    WaitPrimary,
    /// Read-write node with at least one registered standby.
    Primary,
    /// Standby-to-be, waiting for the primary to open replication access.
    WaitStandby,
    /// Standby streaming but still behind the primary's WAL.
    Catchingup,
    /// Caught-up streaming standby.
    Secondary,
    /// Taken out of the formation by an operator; Postgres stopped.
    Maintenance,
    /// Primary draining connections ahead of a demotion.
    Draining,
    /// Former primary, stopped, data directory intact.
    Demoted,
    /// Former primary that demoted itself after a network partition.
    DemoteTimeout,
    /// Standby cutting its replication stream ahead of promotion.
    StopReplication,
    /// Standby elected for promotion, waiting to stop replication.
    PrepPromotion,
    /// Standby promoted, waiting for primary reconfiguration.
    StandbyPromoted,
}

/// All states, in wire-tag order.
pub const ALL_STATES: [NodeState; 14] = [
    NodeState::Init,
    NodeState::Single,
    NodeState::WaitPrimary,
    NodeState::Primary,
    NodeState::WaitStandby,
    NodeState::Catchingup,
    NodeState::Secondary,
    NodeState::Maintenance,
    NodeState::Draining,
    NodeState::Demoted,
    NodeState::DemoteTimeout,
    NodeState::StopReplication,
    NodeState::PrepPromotion,
    NodeState::StandbyPromoted,
];

impl NodeState {
    /// Stable wire tag for the on-disk state record.
    pub fn tag(self) -> u32 {
        match self {
            NodeState::Init => 0,
            NodeState::Single => 1,
            NodeState::WaitPrimary => 2,
            NodeState::Primary => 3,
            NodeState::WaitStandby => 4,
            NodeState::Catchingup => 5,
            NodeState::Secondary => 6,
            NodeState::Maintenance => 7,
            NodeState::Draining => 8,
            NodeState::Demoted => 9,
            NodeState::DemoteTimeout => 10,
            NodeState::StopReplication => 11,
            NodeState::PrepPromotion => 12,
            NodeState::StandbyPromoted => 13,
        }
    }

    /// Decode a wire tag. Unknown tags are rejected, not mapped to a default.
    pub fn from_tag(tag: u32) -> Option<NodeState> {
        ALL_STATES.into_iter().find(|s| s.tag() == tag)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeState::Init => "init",
            NodeState::Single => "single",
            NodeState::WaitPrimary => "wait_primary",
            NodeState::Primary => "primary",
            NodeState::WaitStandby => "wait_standby",
            NodeState::Catchingup => "catchingup",
            NodeState::Secondary => "secondary",
            NodeState::Maintenance => "maintenance",
            NodeState::Draining => "draining",
            NodeState::Demoted => "demoted",
            NodeState::DemoteTimeout => "demote_timeout",
            NodeState::StopReplication => "stop_replication",
            NodeState::PrepPromotion => "prep_promotion",
            NodeState::StandbyPromoted => "standby_promoted",
        }
    }

    /// Whether the role expects the local PostgreSQL to be running.
    ///
    /// Used by `ensure_current_state` to reconcile the process with the role
    /// when no transition is pending.
    pub fn expects_postgres_running(self) -> bool {
        !matches!(
            self,
            NodeState::Init
                | NodeState::Maintenance
                | NodeState::Demoted
                | NodeState::DemoteTimeout
        )
    }

    /// Whether the role serves writes (and therefore owns standbys).
    pub fn is_primary_role(self) -> bool {
        matches!(
            self,
            NodeState::Single | NodeState::WaitPrimary | NodeState::Primary
        )
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unrecognized node state names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown node state: {0}")]
pub struct UnknownNodeState(pub String);

impl FromStr for NodeState {
    type Err = UnknownNodeState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_STATES
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| UnknownNodeState(s.to_string()))
    }
}

#[cfg(test)]
#[path = "node_state_tests.rs"]
mod tests;
