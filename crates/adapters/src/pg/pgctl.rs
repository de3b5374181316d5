// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PgController implementation shelling out to the PostgreSQL binaries.
//!
//! Lifecycle goes through `pg_ctl`, SQL probes and catalog changes through
//! `psql`, cloning and rewinding through `pg_basebackup`/`pg_rewind`. All
//! commands run with `-w`/wait semantics so a returned Ok means the
//! operation landed, not that it was merely requested.

use super::{ControlData, PgController, PgError, UpstreamNode};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Output;
use tokio::process::Command;
use tracing::debug;

pub struct PgCtlController {
    pgdata: PathBuf,
    pgport: u16,
}

impl PgCtlController {
    pub fn new(pgdata: impl Into<PathBuf>, pgport: u16) -> Self {
        Self {
            pgdata: pgdata.into(),
            pgport,
        }
    }

    async fn pg_ctl(&self, args: &[&str]) -> Result<Output, PgError> {
        let pgdata = self.pgdata.display().to_string();
        debug!(?args, %pgdata, "pg_ctl");
        let output = Command::new("pg_ctl")
            .arg("-D")
            .arg(&self.pgdata)
            .args(args)
            .output()
            .await?;
        Ok(output)
    }

    async fn pg_ctl_ok(&self, args: &[&str]) -> Result<(), PgError> {
        let output = self.pg_ctl(args).await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(PgError::Ctl {
                command: format!("pg_ctl {}", args.join(" ")),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    /// Run a single statement through psql against the local server and
    /// return stdout in tuples-only form.
    async fn sql(&self, query: &str) -> Result<String, PgError> {
        debug!(%query, "psql");
        let output = Command::new("psql")
            .arg("-p")
            .arg(self.pgport.to_string())
            .arg("-d")
            .arg("postgres")
            .arg("-tA")
            .arg("-c")
            .arg(query)
            .output()
            .await?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(PgError::Sql {
                query: query.to_string(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    fn hba_path(&self) -> PathBuf {
        self.pgdata.join("pg_hba.conf")
    }

    fn auto_conf_path(&self) -> PathBuf {
        self.pgdata.join("postgresql.auto.conf")
    }
}

#[async_trait]
impl PgController for PgCtlController {
    async fn is_running(&self) -> Result<bool, PgError> {
        let output = self.pg_ctl(&["status"]).await?;
        match output.status.code() {
            Some(0) => Ok(true),
            // 3 is pg_ctl's "no server running"; 4 is "no valid data dir",
            // which is still a truthful "not running" for an empty PGDATA.
            Some(3) | Some(4) => Ok(false),
            _ => Err(PgError::Ctl {
                command: "pg_ctl status".to_string(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }

    async fn wal_lag_bytes(&self) -> Result<u64, PgError> {
        let query = "SELECT COALESCE(pg_wal_lsn_diff(pg_last_wal_receive_lsn(), \
                     pg_last_wal_replay_lsn()), 0)";
        let out = self.sql(query).await?;
        if out.is_empty() {
            return Ok(0);
        }
        out.parse::<i64>()
            .map(|lag| lag.max(0) as u64)
            .map_err(|_| PgError::Parse(format!("wal lag: {out:?}")))
    }

    async fn sync_state(&self) -> Result<String, PgError> {
        self.sql("SELECT COALESCE((SELECT sync_state FROM pg_stat_replication LIMIT 1), '')")
            .await
    }

    async fn has_replica(&self, username: &str) -> Result<bool, PgError> {
        let query = format!(
            "SELECT count(*) FROM pg_stat_replication WHERE usename = '{username}'"
        );
        let out = self.sql(&query).await?;
        Ok(out.parse::<u64>().unwrap_or(0) > 0)
    }

    async fn control_data(&self) -> Result<ControlData, PgError> {
        let output = Command::new("pg_controldata")
            .arg("-D")
            .arg(&self.pgdata)
            .output()
            .await?;
        if !output.status.success() {
            return Err(PgError::Ctl {
                command: "pg_controldata".to_string(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let text = String::from_utf8_lossy(&output.stdout).to_string();
        let mut control = parse_control_data(&text);
        let version_file = std::fs::read_to_string(self.pgdata.join("PG_VERSION"))?;
        control.pg_version = version_file.trim().parse().unwrap_or(0);
        Ok(control)
    }

    async fn start(&self) -> Result<(), PgError> {
        let port_opt = format!("-p {}", self.pgport);
        self.pg_ctl_ok(&["start", "-w", "-o", &port_opt, "-l", "startup.log"])
            .await
    }

    async fn stop(&self) -> Result<(), PgError> {
        self.pg_ctl_ok(&["stop", "-w", "-m", "fast"]).await
    }

    async fn restart(&self) -> Result<(), PgError> {
        self.pg_ctl_ok(&["restart", "-w", "-m", "fast"]).await
    }

    async fn reload_conf(&self) -> Result<(), PgError> {
        self.pg_ctl_ok(&["reload"]).await
    }

    async fn promote(&self) -> Result<(), PgError> {
        self.pg_ctl_ok(&["promote", "-w"]).await
    }

    async fn rewind_to(&self, primary: &UpstreamNode) -> Result<(), PgError> {
        let source = format!(
            "host={} port={} user={} password={}",
            primary.host, primary.port, primary.username, primary.password
        );
        let output = Command::new("pg_rewind")
            .arg("--target-pgdata")
            .arg(&self.pgdata)
            .arg("--source-server")
            .arg(&source)
            .output()
            .await?;
        if !output.status.success() {
            return Err(PgError::Ctl {
                command: "pg_rewind".to_string(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        // Rejoin as a standby of the node we just rewound against.
        let conninfo = format!(
            "primary_conninfo = 'host={} port={} user={} password={}'\n\
             primary_slot_name = '{}'\n",
            primary.host, primary.port, primary.username, primary.password, primary.slot_name
        );
        std::fs::write(self.auto_conf_path(), conninfo)?;
        std::fs::File::create(self.pgdata.join("standby.signal"))?;
        Ok(())
    }

    async fn init_standby(&self, source: &UpstreamNode) -> Result<(), PgError> {
        let output = Command::new("pg_basebackup")
            .arg("-D")
            .arg(&self.pgdata)
            .arg("-h")
            .arg(&source.host)
            .arg("-p")
            .arg(source.port.to_string())
            .arg("-U")
            .arg(&source.username)
            .arg("--slot")
            .arg(&source.slot_name)
            .arg("--wal-method=stream")
            .arg("--write-recovery-conf")
            .env("PGPASSWORD", &source.password)
            .output()
            .await?;
        if !output.status.success() {
            return Err(PgError::Ctl {
                command: "pg_basebackup".to_string(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    async fn add_default_settings(&self) -> Result<(), PgError> {
        let settings = format!(
            "listen_addresses = '*'\n\
             port = {}\n\
             hot_standby = on\n\
             wal_level = replica\n\
             max_wal_senders = 4\n\
             max_replication_slots = 4\n",
            self.pgport
        );
        std::fs::write(self.pgdata.join("postgresql-keeper.conf"), settings)?;

        let conf = self.pgdata.join("postgresql.conf");
        let contents = std::fs::read_to_string(&conf)?;
        let include = "include 'postgresql-keeper.conf'";
        if !contents.contains(include) {
            let mut updated = contents;
            updated.push('\n');
            updated.push_str(include);
            updated.push('\n');
            std::fs::write(&conf, updated)?;
        }
        Ok(())
    }

    async fn create_replication_slot(&self, name: &str) -> Result<(), PgError> {
        let query = format!(
            "SELECT pg_create_physical_replication_slot('{name}') \
             WHERE NOT EXISTS \
             (SELECT 1 FROM pg_replication_slots WHERE slot_name = '{name}')"
        );
        self.sql(&query).await.map(|_| ())
    }

    async fn drop_replication_slot(&self, name: &str) -> Result<(), PgError> {
        let query = format!(
            "SELECT pg_drop_replication_slot('{name}') \
             WHERE EXISTS \
             (SELECT 1 FROM pg_replication_slots WHERE slot_name = '{name}')"
        );
        self.sql(&query).await.map(|_| ())
    }

    async fn enable_sync_rep(&self) -> Result<(), PgError> {
        self.sql("ALTER SYSTEM SET synchronous_standby_names TO '*'")
            .await?;
        self.sql("SELECT pg_reload_conf()").await.map(|_| ())
    }

    async fn disable_sync_rep(&self) -> Result<(), PgError> {
        self.sql("ALTER SYSTEM SET synchronous_standby_names TO ''")
            .await?;
        self.sql("SELECT pg_reload_conf()").await.map(|_| ())
    }

    async fn create_monitor_user(&self, host: &str, auth_method: &str) -> Result<(), PgError> {
        let query = "DO $$ BEGIN \
                     IF NOT EXISTS (SELECT FROM pg_roles WHERE rolname = 'autoctl_node') THEN \
                     CREATE ROLE autoctl_node LOGIN; END IF; END $$";
        self.sql(query).await?;

        let line = format!("host all autoctl_node {host}/32 {auth_method}\n");
        append_hba_line(&self.hba_path(), &line)?;
        self.reload_conf().await
    }

    async fn create_replication_user(&self, name: &str, password: &str) -> Result<(), PgError> {
        let query = format!(
            "DO $$ BEGIN \
             IF NOT EXISTS (SELECT FROM pg_roles WHERE rolname = '{name}') THEN \
             CREATE ROLE {name} REPLICATION LOGIN PASSWORD '{password}'; \
             ELSE ALTER ROLE {name} REPLICATION LOGIN PASSWORD '{password}'; \
             END IF; END $$"
        );
        self.sql(&query).await.map(|_| ())
    }

    async fn add_standby_to_hba(&self, host: &str, username: &str) -> Result<(), PgError> {
        let line = format!("host replication {username} {host}/32 md5\n");
        append_hba_line(&self.hba_path(), &line)?;
        self.reload_conf().await
    }
}

/// Pick the control-file identity fields out of pg_controldata output.
fn parse_control_data(text: &str) -> ControlData {
    let mut control = ControlData::default();
    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "pg_control version number" => {
                control.pg_control_version = value.parse().unwrap_or(0);
            }
            "Database system identifier" => {
                control.system_identifier = value.parse().unwrap_or(0);
            }
            _ => {}
        }
    }
    control
}

/// Append an hba rule unless an identical one is already present.
fn append_hba_line(path: &std::path::Path, line: &str) -> Result<(), PgError> {
    let contents = std::fs::read_to_string(path).unwrap_or_default();
    if contents.lines().any(|l| l.trim() == line.trim()) {
        return Ok(());
    }
    let mut updated = contents;
    updated.push_str(line);
    std::fs::write(path, updated)?;
    Ok(())
}

#[cfg(test)]
#[path = "pgctl_tests.rs"]
mod tests;
