// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! MonitorClient implementation over psql.
//!
//! The monitor's API is the `pgautofailover` SQL extension; every call here
//! is one statement run through `psql -tA` against the monitor URI. Calls
//! are wrapped in a hard timeout so a wedged network cannot stall a
//! reconcile tick past its interval.

use super::{MonitorClient, MonitorError};
use async_trait::async_trait;
use pgk_core::{MonitorAssignment, NodeActiveReport, NodeState};
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

pub struct PsqlMonitorClient {
    monitor_uri: String,
    timeout: Duration,
}

impl PsqlMonitorClient {
    pub fn new(monitor_uri: impl Into<String>, timeout: Duration) -> Self {
        Self {
            monitor_uri: monitor_uri.into(),
            timeout,
        }
    }

    async fn query(&self, sql: &str) -> Result<String, MonitorError> {
        debug!(%sql, "monitor query");
        let run = async {
            let output = Command::new("psql")
                .arg("-d")
                .arg(&self.monitor_uri)
                .arg("-tA")
                .arg("-c")
                .arg(sql)
                .env("PGCONNECT_TIMEOUT", self.timeout.as_secs().to_string())
                .output()
                .await
                .map_err(|e| MonitorError(format!("psql spawn failed: {e}")))?;
            if output.status.success() {
                Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
            } else {
                Err(MonitorError(
                    String::from_utf8_lossy(&output.stderr).trim().to_string(),
                ))
            }
        };
        tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| MonitorError("monitor call timed out".to_string()))?
    }

    async fn query_assignment(&self, sql: &str) -> Result<MonitorAssignment, MonitorError> {
        let row = self.query(sql).await?;
        parse_assignment(&row)
    }
}

/// Parse a `node_id|group_id|state|peer_host|peer_port` row into an
/// assignment. The peer columns are empty when the group has no other node.
fn parse_assignment(row: &str) -> Result<MonitorAssignment, MonitorError> {
    let mut fields = row.split('|');
    let (Some(node_id), Some(group_id), Some(state)) =
        (fields.next(), fields.next(), fields.next())
    else {
        return Err(MonitorError(format!("short assignment row: {row:?}")));
    };

    let node_id = node_id
        .parse::<i64>()
        .map_err(|_| MonitorError(format!("bad node id in {row:?}")))?;
    let group_id = group_id
        .parse::<i64>()
        .map_err(|_| MonitorError(format!("bad group id in {row:?}")))?;
    let assigned_state = state
        .parse::<NodeState>()
        .map_err(|e| MonitorError(e.to_string()))?;

    let peer_host = fields
        .next()
        .filter(|h| !h.is_empty())
        .map(str::to_string);
    let peer_port = fields.next().and_then(|p| p.parse::<u16>().ok());

    Ok(MonitorAssignment {
        assigned_state,
        node_id,
        group_id,
        peer_host,
        peer_port,
    })
}

#[async_trait]
impl MonitorClient for PsqlMonitorClient {
    async fn node_active(
        &self,
        report: &NodeActiveReport,
    ) -> Result<MonitorAssignment, MonitorError> {
        let sql = format!(
            "SELECT assigned_node_id, assigned_group_id, assigned_node_state, \
             peer_node_name, peer_node_port \
             FROM pgautofailover.node_active('{}', '{}', {}, {}, {}, \
             '{}'::pgautofailover.replication_state, {}, {}, '{}')",
            report.formation,
            report.nodename,
            report.pgport,
            report.node_id,
            report.group_id,
            report.current_role,
            report.pg_is_running,
            report.wal_lag_bytes,
            report.sync_state,
        );
        self.query_assignment(&sql).await
    }

    async fn register(
        &self,
        formation: &str,
        nodename: &str,
        pgport: u16,
        initial_state: NodeState,
    ) -> Result<MonitorAssignment, MonitorError> {
        let sql = format!(
            "SELECT assigned_node_id, assigned_group_id, assigned_node_state, \
             peer_node_name, peer_node_port \
             FROM pgautofailover.register_node('{formation}', '{nodename}', {pgport}, \
             '{initial_state}'::pgautofailover.replication_state)"
        );
        self.query_assignment(&sql).await
    }

    async fn remove(&self, node_id: i64, group_id: i64) -> Result<(), MonitorError> {
        let sql =
            format!("SELECT pgautofailover.remove_node({node_id}, {group_id})");
        self.query(&sql).await.map(|_| ())
    }

    async fn extension_version(&self) -> Result<String, MonitorError> {
        self.query(
            "SELECT extversion FROM pg_extension WHERE extname = 'pgautofailover'",
        )
        .await
    }

    async fn formation_uri(&self, formation: &str) -> Result<String, MonitorError> {
        let sql = format!(
            "SELECT pgautofailover.formation_uri('{formation}')"
        );
        self.query(&sql).await
    }

    async fn last_events(
        &self,
        formation: &str,
        count: usize,
    ) -> Result<Vec<String>, MonitorError> {
        let sql = format!(
            "SELECT format('%s | %s | %s', eventtime, nodename, description) \
             FROM pgautofailover.last_events('{formation}', {count})"
        );
        let out = self.query(&sql).await?;
        Ok(out.lines().map(str::to_string).collect())
    }

    async fn create_formation(&self, formation: &str) -> Result<(), MonitorError> {
        let sql = format!(
            "SELECT pgautofailover.create_formation('{formation}', 'pgsql')"
        );
        self.query(&sql).await.map(|_| ())
    }

    async fn drop_formation(&self, formation: &str) -> Result<(), MonitorError> {
        let sql = format!("SELECT pgautofailover.drop_formation('{formation}')");
        self.query(&sql).await.map(|_| ())
    }

    async fn set_maintenance(
        &self,
        node_id: i64,
        group_id: i64,
        enabled: bool,
    ) -> Result<(), MonitorError> {
        let func = if enabled {
            "start_maintenance"
        } else {
            "stop_maintenance"
        };
        let sql = format!("SELECT pgautofailover.{func}({node_id}, {group_id})");
        self.query(&sql).await.map(|_| ())
    }

    async fn set_secondary(&self, formation: &str, enabled: bool) -> Result<(), MonitorError> {
        let sql = format!(
            "SELECT pgautofailover.set_formation_number_sync_standbys('{formation}', {})",
            if enabled { 1 } else { 0 }
        );
        self.query(&sql).await.map(|_| ())
    }
}

#[cfg(test)]
#[path = "psql_tests.rs"]
mod tests;
