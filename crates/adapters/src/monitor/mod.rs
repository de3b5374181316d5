// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monitor coordination seam.

mod psql;

pub use psql::PsqlMonitorClient;

use async_trait::async_trait;
use pgk_core::{MonitorAssignment, NodeActiveReport, NodeState};
use thiserror::Error;

/// The single failure kind for monitor traffic.
///
/// The keeper does not care whether the network, the monitor's server, or
/// its SQL surface failed; every flavor means "no assignment this tick" and
/// retry policy belongs to the reconcile loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("monitor unreachable: {0}")]
pub struct MonitorError(pub String);

impl From<MonitorError> for pgk_core::KeeperError {
    fn from(err: MonitorError) -> Self {
        pgk_core::KeeperError::MonitorUnreachable(err.0)
    }
}

/// Request/response surface of the remote coordinator.
#[async_trait]
pub trait MonitorClient: Send + Sync {
    /// Report this node's observed state; the answer carries the assignment.
    async fn node_active(
        &self,
        report: &NodeActiveReport,
    ) -> Result<MonitorAssignment, MonitorError>;

    /// First contact: register the node into a formation.
    async fn register(
        &self,
        formation: &str,
        nodename: &str,
        pgport: u16,
        initial_state: NodeState,
    ) -> Result<MonitorAssignment, MonitorError>;

    /// Remove the node from its formation.
    async fn remove(&self, node_id: i64, group_id: i64) -> Result<(), MonitorError>;

    /// Version of the monitor-side extension.
    async fn extension_version(&self) -> Result<String, MonitorError>;

    // membership ops used by the CLI

    async fn formation_uri(&self, formation: &str) -> Result<String, MonitorError>;

    async fn last_events(&self, formation: &str, count: usize)
        -> Result<Vec<String>, MonitorError>;

    async fn create_formation(&self, formation: &str) -> Result<(), MonitorError>;

    async fn drop_formation(&self, formation: &str) -> Result<(), MonitorError>;

    async fn set_maintenance(
        &self,
        node_id: i64,
        group_id: i64,
        enabled: bool,
    ) -> Result<(), MonitorError>;

    /// Toggle whether the formation wants a secondary at all.
    async fn set_secondary(&self, formation: &str, enabled: bool) -> Result<(), MonitorError>;
}
