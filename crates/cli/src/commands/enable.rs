// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `pgk enable ...` and `pgk disable ...`

use super::{load_config, monitor_client};
use crate::exit_error::ExitError;
use clap::Subcommand;
use pgk_adapters::MonitorClient;
use pgk_storage::StateStore;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum EnableCommand {
    /// Ask the formation to keep a synchronous secondary
    Secondary,
    /// Put this node into maintenance
    Maintenance,
}

#[derive(Subcommand)]
pub enum DisableCommand {
    /// Stop requiring a synchronous secondary for the formation
    Secondary,
    /// Bring this node back from maintenance
    Maintenance,
}

pub async fn run_enable(cmd: EnableCommand, pgdata: Option<PathBuf>) -> Result<(), ExitError> {
    match cmd {
        EnableCommand::Secondary => set_secondary(pgdata, true).await,
        EnableCommand::Maintenance => set_maintenance(pgdata, true).await,
    }
}

pub async fn run_disable(cmd: DisableCommand, pgdata: Option<PathBuf>) -> Result<(), ExitError> {
    match cmd {
        DisableCommand::Secondary => set_secondary(pgdata, false).await,
        DisableCommand::Maintenance => set_maintenance(pgdata, false).await,
    }
}

async fn set_secondary(pgdata: Option<PathBuf>, enabled: bool) -> Result<(), ExitError> {
    let config = load_config(pgdata)?;
    monitor_client(&config)
        .set_secondary(&config.pg_autoctl.formation, enabled)
        .await?;
    println!(
        "secondary {} for formation {}",
        if enabled { "enabled" } else { "disabled" },
        config.pg_autoctl.formation
    );
    Ok(())
}

async fn set_maintenance(pgdata: Option<PathBuf>, enabled: bool) -> Result<(), ExitError> {
    let config = load_config(pgdata)?;
    let state = StateStore::new(&config.paths().state).read()?;
    monitor_client(&config)
        .set_maintenance(state.current_node_id, state.current_group, enabled)
        .await?;
    println!(
        "maintenance {} for node {}",
        if enabled { "requested" } else { "lifted" },
        state.current_node_id
    );
    Ok(())
}
