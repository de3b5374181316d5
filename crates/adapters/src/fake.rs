// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Call-recording fakes used by the keeper's unit and scenario tests.
//!
//! The Postgres fake keeps a tiny model of the instance (running flag, lag,
//! replica presence) and can be told to fail specific operations. The
//! monitor fake replays a scripted queue of assignments and errors; when
//! the script runs dry it echoes the reported role back, which is what a
//! quiet monitor does.

use crate::monitor::{MonitorClient, MonitorError};
use crate::pg::{ControlData, PgController, PgError, UpstreamNode};
use async_trait::async_trait;
use parking_lot::Mutex;
use pgk_core::{MonitorAssignment, NodeActiveReport, NodeState};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

#[derive(Default)]
struct FakePgInner {
    running: bool,
    wal_lag_bytes: u64,
    sync_state: String,
    replica_connected: bool,
    control: ControlData,
    fail_ops: HashSet<String>,
    calls: Vec<String>,
}

#[derive(Clone, Default)]
pub struct FakePgController {
    inner: Arc<Mutex<FakePgInner>>,
}

impl FakePgController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_running(&self, running: bool) {
        self.inner.lock().running = running;
    }

    pub fn set_wal_lag(&self, bytes: u64) {
        self.inner.lock().wal_lag_bytes = bytes;
    }

    pub fn set_sync_state(&self, sync_state: &str) {
        self.inner.lock().sync_state = sync_state.to_string();
    }

    pub fn set_replica_connected(&self, connected: bool) {
        self.inner.lock().replica_connected = connected;
    }

    pub fn set_control_data(&self, control: ControlData) {
        self.inner.lock().control = control;
    }

    /// Make the named operation fail until cleared.
    pub fn fail_on(&self, op: &str) {
        self.inner.lock().fail_ops.insert(op.to_string());
    }

    pub fn clear_failures(&self) {
        self.inner.lock().fail_ops.clear();
    }

    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().calls.clone()
    }

    pub fn called(&self, op: &str) -> bool {
        self.inner
            .lock()
            .calls
            .iter()
            .any(|c| c == op || c.starts_with(&format!("{op} ")))
    }

    pub fn is_running_now(&self) -> bool {
        self.inner.lock().running
    }

    fn record(&self, call: &str) -> Result<(), PgError> {
        let mut inner = self.inner.lock();
        inner.calls.push(call.to_string());
        let op = call.split(' ').next().unwrap_or(call);
        if inner.fail_ops.contains(op) {
            return Err(PgError::Ctl {
                command: op.to_string(),
                detail: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PgController for FakePgController {
    async fn is_running(&self) -> Result<bool, PgError> {
        self.record("is_running")?;
        Ok(self.inner.lock().running)
    }

    async fn wal_lag_bytes(&self) -> Result<u64, PgError> {
        self.record("wal_lag_bytes")?;
        Ok(self.inner.lock().wal_lag_bytes)
    }

    async fn sync_state(&self) -> Result<String, PgError> {
        self.record("sync_state")?;
        Ok(self.inner.lock().sync_state.clone())
    }

    async fn has_replica(&self, username: &str) -> Result<bool, PgError> {
        self.record(&format!("has_replica {username}"))?;
        Ok(self.inner.lock().replica_connected)
    }

    async fn control_data(&self) -> Result<ControlData, PgError> {
        self.record("control_data")?;
        Ok(self.inner.lock().control)
    }

    async fn start(&self) -> Result<(), PgError> {
        self.record("start")?;
        self.inner.lock().running = true;
        Ok(())
    }

    async fn stop(&self) -> Result<(), PgError> {
        self.record("stop")?;
        self.inner.lock().running = false;
        Ok(())
    }

    async fn restart(&self) -> Result<(), PgError> {
        self.record("restart")?;
        self.inner.lock().running = true;
        Ok(())
    }

    async fn reload_conf(&self) -> Result<(), PgError> {
        self.record("reload_conf")
    }

    async fn promote(&self) -> Result<(), PgError> {
        self.record("promote")
    }

    async fn rewind_to(&self, primary: &UpstreamNode) -> Result<(), PgError> {
        self.record(&format!("rewind_to {}:{}", primary.host, primary.port))
    }

    async fn init_standby(&self, source: &UpstreamNode) -> Result<(), PgError> {
        self.record(&format!("init_standby {}:{}", source.host, source.port))
    }

    async fn add_default_settings(&self) -> Result<(), PgError> {
        self.record("add_default_settings")
    }

    async fn create_replication_slot(&self, name: &str) -> Result<(), PgError> {
        self.record(&format!("create_replication_slot {name}"))
    }

    async fn drop_replication_slot(&self, name: &str) -> Result<(), PgError> {
        self.record(&format!("drop_replication_slot {name}"))
    }

    async fn enable_sync_rep(&self) -> Result<(), PgError> {
        self.record("enable_sync_rep")
    }

    async fn disable_sync_rep(&self) -> Result<(), PgError> {
        self.record("disable_sync_rep")
    }

    async fn create_monitor_user(&self, host: &str, auth_method: &str) -> Result<(), PgError> {
        self.record(&format!("create_monitor_user {host} {auth_method}"))
    }

    async fn create_replication_user(&self, name: &str, _password: &str) -> Result<(), PgError> {
        self.record(&format!("create_replication_user {name}"))
    }

    async fn add_standby_to_hba(&self, host: &str, username: &str) -> Result<(), PgError> {
        self.record(&format!("add_standby_to_hba {host} {username}"))
    }
}

#[derive(Default)]
struct FakeMonitorInner {
    responses: VecDeque<Result<NodeState, MonitorError>>,
    node_id: i64,
    group_id: i64,
    peer: Option<(String, u16)>,
    reports: Vec<NodeActiveReport>,
    calls: Vec<String>,
}

#[derive(Clone, Default)]
pub struct FakeMonitorClient {
    inner: Arc<Mutex<FakeMonitorInner>>,
}

impl FakeMonitorClient {
    pub fn new() -> Self {
        let fake = Self::default();
        fake.set_ids(1, 0);
        fake
    }

    pub fn set_ids(&self, node_id: i64, group_id: i64) {
        let mut inner = self.inner.lock();
        inner.node_id = node_id;
        inner.group_id = group_id;
    }

    /// Teach the monitor about the other node of the group.
    pub fn set_peer(&self, host: &str, port: u16) {
        self.inner.lock().peer = Some((host.to_string(), port));
    }

    /// Queue an assignment for the next `node_active`/`register` call.
    pub fn push_assignment(&self, state: NodeState) {
        self.inner.lock().responses.push_back(Ok(state));
    }

    /// Queue a failed round-trip.
    pub fn push_error(&self, detail: &str) {
        self.inner
            .lock()
            .responses
            .push_back(Err(MonitorError(detail.to_string())));
    }

    /// Queue the same failure n times (partition simulations).
    pub fn push_errors(&self, detail: &str, n: usize) {
        for _ in 0..n {
            self.push_error(detail);
        }
    }

    pub fn reports(&self) -> Vec<NodeActiveReport> {
        self.inner.lock().reports.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().calls.clone()
    }

    fn next_assignment(
        &self,
        echoed_state: NodeState,
    ) -> Result<MonitorAssignment, MonitorError> {
        let mut inner = self.inner.lock();
        let state = match inner.responses.pop_front() {
            Some(Ok(state)) => state,
            Some(Err(err)) => return Err(err),
            // Script ran dry: a quiet monitor re-assigns the reported role.
            None => echoed_state,
        };
        Ok(MonitorAssignment {
            assigned_state: state,
            node_id: inner.node_id,
            group_id: inner.group_id,
            peer_host: inner.peer.as_ref().map(|(host, _)| host.clone()),
            peer_port: inner.peer.as_ref().map(|(_, port)| *port),
        })
    }
}

#[async_trait]
impl MonitorClient for FakeMonitorClient {
    async fn node_active(
        &self,
        report: &NodeActiveReport,
    ) -> Result<MonitorAssignment, MonitorError> {
        {
            let mut inner = self.inner.lock();
            inner.calls.push("node_active".to_string());
            inner.reports.push(report.clone());
        }
        self.next_assignment(report.current_role)
    }

    async fn register(
        &self,
        formation: &str,
        _nodename: &str,
        _pgport: u16,
        initial_state: NodeState,
    ) -> Result<MonitorAssignment, MonitorError> {
        self.inner
            .lock()
            .calls
            .push(format!("register {formation}"));
        self.next_assignment(initial_state)
    }

    async fn remove(&self, node_id: i64, group_id: i64) -> Result<(), MonitorError> {
        self.inner
            .lock()
            .calls
            .push(format!("remove {node_id} {group_id}"));
        Ok(())
    }

    async fn extension_version(&self) -> Result<String, MonitorError> {
        self.inner.lock().calls.push("extension_version".to_string());
        Ok("1.4".to_string())
    }

    async fn formation_uri(&self, formation: &str) -> Result<String, MonitorError> {
        self.inner
            .lock()
            .calls
            .push(format!("formation_uri {formation}"));
        Ok(format!("postgres://{formation}.example/postgres"))
    }

    async fn last_events(
        &self,
        formation: &str,
        count: usize,
    ) -> Result<Vec<String>, MonitorError> {
        self.inner
            .lock()
            .calls
            .push(format!("last_events {formation} {count}"));
        Ok(Vec::new())
    }

    async fn create_formation(&self, formation: &str) -> Result<(), MonitorError> {
        self.inner
            .lock()
            .calls
            .push(format!("create_formation {formation}"));
        Ok(())
    }

    async fn drop_formation(&self, formation: &str) -> Result<(), MonitorError> {
        self.inner
            .lock()
            .calls
            .push(format!("drop_formation {formation}"));
        Ok(())
    }

    async fn set_maintenance(
        &self,
        node_id: i64,
        group_id: i64,
        enabled: bool,
    ) -> Result<(), MonitorError> {
        self.inner
            .lock()
            .calls
            .push(format!("set_maintenance {node_id} {group_id} {enabled}"));
        Ok(())
    }

    async fn set_secondary(&self, formation: &str, enabled: bool) -> Result<(), MonitorError> {
        self.inner
            .lock()
            .calls
            .push(format!("set_secondary {formation} {enabled}"));
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
