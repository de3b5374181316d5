// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod config;
pub mod create;
pub mod do_cmd;
pub mod drop;
pub mod enable;
pub mod service;
pub mod show;

use crate::exit_error::ExitError;
use pgk_adapters::PsqlMonitorClient;
use pgk_keeper::KeeperConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Load the keeper configuration for a resolved data directory.
pub(crate) fn load_config(pgdata: Option<PathBuf>) -> Result<KeeperConfig, ExitError> {
    let pgdata = crate::resolve_pgdata(pgdata)?;
    let paths = pgk_keeper::KeeperPaths::under(&pgdata);
    Ok(KeeperConfig::load(&paths.config)?)
}

/// Monitor client for the configured monitor URI.
pub(crate) fn monitor_client(config: &KeeperConfig) -> PsqlMonitorClient {
    PsqlMonitorClient::new(
        &config.pg_autoctl.monitor_uri,
        Duration::from_secs(config.timeout.monitor_call_timeout),
    )
}
