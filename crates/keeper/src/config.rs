// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Keeper configuration file.
//!
//! Lives at `{pgdata}/pg_autoctl.cfg`, INI-style sections serialized with
//! toml. Identity fields (role, formation, nodename, pgport, monitor_uri,
//! replication settings) are fixed for the life of the node; only the
//! `[timeout]` values and the httpd listen address/port may change across a
//! SIGHUP reload.

use pgk_core::KeeperError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// What kind of node this configuration describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Keeper,
    Monitor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSection {
    #[serde(default = "default_role")]
    pub role: NodeKind,
    pub formation: String,
    pub nodename: String,
    pub monitor_uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostgresSection {
    pub pgdata: PathBuf,
    #[serde(default = "default_pgport")]
    pub pgport: u16,
    #[serde(default = "default_auth_method")]
    pub auth_method: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicationSection {
    #[serde(default = "default_slot_name")]
    pub slot_name: String,
    #[serde(default = "default_replication_user")]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl Default for ReplicationSection {
    fn default() -> Self {
        Self {
            slot_name: default_slot_name(),
            username: default_replication_user(),
            password: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeoutSection {
    /// τ: bilateral unreachability longer than this demotes a primary.
    #[serde(default = "default_partition_timeout")]
    pub network_partition_timeout: u64,
    /// Upper bound on a single monitor round-trip.
    #[serde(default = "default_monitor_timeout")]
    pub monitor_call_timeout: u64,
}

impl Default for TimeoutSection {
    fn default() -> Self {
        Self {
            network_partition_timeout: default_partition_timeout(),
            monitor_call_timeout: default_monitor_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpdSection {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    #[serde(default = "default_httpd_port")]
    pub port: u16,
}

impl Default for HttpdSection {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            port: default_httpd_port(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeeperConfig {
    pub pg_autoctl: ServiceSection,
    pub postgresql: PostgresSection,
    #[serde(default)]
    pub replication: ReplicationSection,
    #[serde(default)]
    pub timeout: TimeoutSection,
    #[serde(default)]
    pub httpd: HttpdSection,
}

fn default_role() -> NodeKind {
    NodeKind::Keeper
}
fn default_pgport() -> u16 {
    5432
}
fn default_auth_method() -> String {
    "trust".to_string()
}
fn default_slot_name() -> String {
    "pgautofailover_standby".to_string()
}
fn default_replication_user() -> String {
    "pgautofailover_replicator".to_string()
}
fn default_partition_timeout() -> u64 {
    20
}
fn default_monitor_timeout() -> u64 {
    5
}
fn default_listen_address() -> String {
    "127.0.0.1".to_string()
}
fn default_httpd_port() -> u16 {
    8000
}

/// Files the keeper owns, all siblings under pgdata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeeperPaths {
    pub config: PathBuf,
    pub state: PathBuf,
    pub init: PathBuf,
    pub pid: PathBuf,
    pub log: PathBuf,
}

impl KeeperPaths {
    pub fn under(pgdata: &Path) -> Self {
        Self {
            config: pgdata.join("pg_autoctl.cfg"),
            state: pgdata.join("pg_autoctl.state"),
            init: pgdata.join("pg_autoctl.init"),
            pid: pgdata.join("pg_autoctl.pid"),
            log: pgdata.join("pg_autoctl.log"),
        }
    }
}

impl KeeperConfig {
    /// A fresh keeper configuration for `create postgres`.
    pub fn seed(
        pgdata: PathBuf,
        formation: String,
        nodename: String,
        monitor_uri: String,
    ) -> Self {
        Self {
            pg_autoctl: ServiceSection {
                role: NodeKind::Keeper,
                formation,
                nodename,
                monitor_uri,
            },
            postgresql: PostgresSection {
                pgdata,
                pgport: default_pgport(),
                auth_method: default_auth_method(),
            },
            replication: ReplicationSection::default(),
            timeout: TimeoutSection::default(),
            httpd: HttpdSection::default(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, KeeperError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            KeeperError::ConfigInvalid(format!("cannot read {}: {e}", path.display()))
        })?;
        toml::from_str(&text)
            .map_err(|e| KeeperError::ConfigInvalid(format!("{}: {e}", path.display())))
    }

    pub fn save(&self, path: &Path) -> Result<(), KeeperError> {
        let text = toml::to_string_pretty(self)
            .map_err(|e| KeeperError::ConfigInvalid(e.to_string()))?;
        std::fs::write(path, text).map_err(|e| {
            KeeperError::ConfigInvalid(format!("cannot write {}: {e}", path.display()))
        })
    }

    pub fn paths(&self) -> KeeperPaths {
        KeeperPaths::under(&self.postgresql.pgdata)
    }

    /// Host portion of the monitor URI, for hba rules.
    pub fn monitor_host(&self) -> String {
        host_of_uri(&self.pg_autoctl.monitor_uri)
    }

    /// Fold a freshly parsed file into the running configuration.
    ///
    /// Only the reloadable fields are taken; edits to identity fields are
    /// logged and ignored until the next full restart.
    pub fn apply_reload(&mut self, fresh: KeeperConfig) {
        if fresh.pg_autoctl != self.pg_autoctl {
            warn!("ignoring reload of [pg_autoctl] identity settings");
        }
        if fresh.postgresql != self.postgresql {
            warn!("ignoring reload of [postgresql] settings");
        }
        if fresh.replication != self.replication {
            warn!("ignoring reload of [replication] settings");
        }
        self.timeout = fresh.timeout;
        self.httpd = fresh.httpd;
    }

    /// Re-read the file and fold in reloadable fields. A parse error keeps
    /// the current configuration untouched.
    pub fn reload(&mut self, path: &Path) -> Result<(), KeeperError> {
        let fresh = KeeperConfig::load(path)?;
        self.apply_reload(fresh);
        Ok(())
    }
}

/// Extract the host from a `postgres://user@host:port/db` style URI.
fn host_of_uri(uri: &str) -> String {
    let rest = uri.split("://").nth(1).unwrap_or(uri);
    let rest = rest.rsplit('@').next().unwrap_or(rest);
    let rest = rest.split('/').next().unwrap_or(rest);
    rest.split(':').next().unwrap_or(rest).to_string()
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
