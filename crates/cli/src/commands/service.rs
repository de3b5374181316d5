// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `pgk run`, `pgk stop`, `pgk reload`, `pgk version`

use super::load_config;
use crate::exit_error::ExitError;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use pgk_keeper::{supervisor, version as keeper_version, KeeperPaths, NodeKind};
use pgk_storage::{init_marker, StateStore};
use std::path::{Path, PathBuf};

/// Run the keeper service. Returns the process exit code.
pub async fn run(pgdata: Option<PathBuf>) -> Result<i32, ExitError> {
    let config = load_config(pgdata)?;
    if config.pg_autoctl.role == NodeKind::Monitor {
        return Err(ExitError::bad_state(
            "this data directory is configured as a monitor, not a keeper",
        ));
    }

    let paths = config.paths();
    if init_marker::exists(&paths.init) {
        return Err(ExitError::bad_state(
            "initialization did not complete; re-run `pgk create postgres` or drop the node",
        ));
    }
    if !StateStore::new(&paths.state).exists() {
        return Err(ExitError::bad_state(
            "no state file; run `pgk create postgres` first",
        ));
    }

    Ok(supervisor::run_service(config).await)
}

/// SIGTERM the running keeper (graceful stop).
pub fn stop(pgdata: Option<PathBuf>) -> Result<(), ExitError> {
    signal_keeper(pgdata, Signal::SIGTERM, "stop")
}

/// SIGHUP the running keeper (reload configuration).
pub fn reload(pgdata: Option<PathBuf>) -> Result<(), ExitError> {
    signal_keeper(pgdata, Signal::SIGHUP, "reload")
}

pub fn version() {
    println!("pgk {}", keeper_version::CLI_VERSION);
    println!("pgautofailover extension {}", keeper_version::EXTENSION_VERSION);
    println!("status API {}", keeper_version::API_VERSION);
}

fn signal_keeper(
    pgdata: Option<PathBuf>,
    signal: Signal,
    verb: &str,
) -> Result<(), ExitError> {
    let pgdata = crate::resolve_pgdata(pgdata)?;
    let pid_path = KeeperPaths::under(&pgdata).pid;
    let pid = read_pid(&pid_path).ok_or_else(|| {
        ExitError::bad_state(format!(
            "no keeper is running for {} (no pid file)",
            pgdata.display()
        ))
    })?;

    kill(Pid::from_raw(pid), signal)
        .map_err(|e| ExitError::bad_state(format!("cannot {verb} pid {pid}: {e}")))?;
    println!("sent {signal:?} to keeper pid {pid}");
    Ok(())
}

fn read_pid(path: &Path) -> Option<i32> {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|s| s.trim().parse::<i32>().ok())
}
