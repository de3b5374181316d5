// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local PostgreSQL control seam.

mod pgctl;

pub use pgctl::PgCtlController;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PgError {
    #[error("postgres io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{command} failed: {detail}")]
    Ctl { command: String, detail: String },

    #[error("query failed ({query}): {detail}")]
    Sql { query: String, detail: String },

    #[error("unparseable postgres output: {0}")]
    Parse(String),
}

impl From<PgError> for pgk_core::KeeperError {
    fn from(err: PgError) -> Self {
        pgk_core::KeeperError::PgControllerFailure(err.to_string())
    }
}

/// Identity of the cluster behind a data directory, from pg_controldata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlData {
    pub pg_version: u32,
    pub pg_control_version: u32,
    pub system_identifier: u64,
}

/// Upstream node a standby replicates from (or rewinds against).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamNode {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub slot_name: String,
}

/// Capability set over the local PostgreSQL instance.
///
/// Every operation is a single, idempotent-ish step; sequencing belongs to
/// the FSM's action programs.
#[async_trait]
pub trait PgController: Send + Sync {
    // probes
    async fn is_running(&self) -> Result<bool, PgError>;
    /// Streaming lag estimate in bytes (received vs replayed WAL); zero on a
    /// primary or an idle standby.
    async fn wal_lag_bytes(&self) -> Result<u64, PgError>;
    async fn sync_state(&self) -> Result<String, PgError>;
    /// Whether a standby is currently connected under the given replication
    /// user.
    async fn has_replica(&self, username: &str) -> Result<bool, PgError>;
    async fn control_data(&self) -> Result<ControlData, PgError>;

    // lifecycle
    async fn start(&self) -> Result<(), PgError>;
    async fn stop(&self) -> Result<(), PgError>;
    async fn restart(&self) -> Result<(), PgError>;
    async fn reload_conf(&self) -> Result<(), PgError>;

    // role transitions
    async fn promote(&self) -> Result<(), PgError>;
    async fn rewind_to(&self, primary: &UpstreamNode) -> Result<(), PgError>;
    async fn init_standby(&self, source: &UpstreamNode) -> Result<(), PgError>;

    // configuration
    async fn add_default_settings(&self) -> Result<(), PgError>;
    async fn create_replication_slot(&self, name: &str) -> Result<(), PgError>;
    async fn drop_replication_slot(&self, name: &str) -> Result<(), PgError>;
    async fn enable_sync_rep(&self) -> Result<(), PgError>;
    async fn disable_sync_rep(&self) -> Result<(), PgError>;

    // users and auth
    async fn create_monitor_user(&self, host: &str, auth_method: &str) -> Result<(), PgError>;
    async fn create_replication_user(&self, name: &str, password: &str) -> Result<(), PgError>;
    async fn add_standby_to_hba(&self, host: &str, username: &str) -> Result<(), PgError>;
}
