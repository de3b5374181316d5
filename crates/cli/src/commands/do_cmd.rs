// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `pgk do <primitive>`: the PgController operations, one at a time.
//!
//! These bypass the state machine entirely; they exist for repairs and for
//! watching a single step fail in isolation. The reconcile loop never
//! needs them.

use super::load_config;
use crate::exit_error::ExitError;
use clap::Subcommand;
use pgk_adapters::{PgController, PgCtlController, UpstreamNode};
use pgk_keeper::KeeperConfig;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum DoCommand {
    /// Start the local PostgreSQL
    Start,
    /// Stop the local PostgreSQL
    Stop,
    /// Restart the local PostgreSQL
    Restart,
    /// Promote a standby to read-write
    Promote,
    /// Install the keeper's default PostgreSQL settings
    AddDefaultSettings,
    /// Create the replication slot
    CreateSlot {
        /// Slot name (defaults to the configured one)
        #[arg(long)]
        name: Option<String>,
    },
    /// Drop the replication slot
    DropSlot {
        /// Slot name (defaults to the configured one)
        #[arg(long)]
        name: Option<String>,
    },
    /// Enable synchronous replication
    EnableSync,
    /// Disable synchronous replication
    DisableSync,
    /// Rewind this data directory against a primary
    Rewind {
        #[arg(long)]
        host: String,
        #[arg(long, default_value_t = 5432)]
        port: u16,
    },
    /// Clone a primary into this data directory
    InitStandby {
        #[arg(long)]
        host: String,
        #[arg(long, default_value_t = 5432)]
        port: u16,
    },
}

pub async fn run(cmd: DoCommand, pgdata: Option<PathBuf>) -> Result<(), ExitError> {
    let config = load_config(pgdata)?;
    let pg = PgCtlController::new(&config.postgresql.pgdata, config.postgresql.pgport);

    match cmd {
        DoCommand::Start => pg.start().await?,
        DoCommand::Stop => pg.stop().await?,
        DoCommand::Restart => pg.restart().await?,
        DoCommand::Promote => pg.promote().await?,
        DoCommand::AddDefaultSettings => pg.add_default_settings().await?,
        DoCommand::CreateSlot { name } => {
            let name = name.unwrap_or_else(|| config.replication.slot_name.clone());
            pg.create_replication_slot(&name).await?;
        }
        DoCommand::DropSlot { name } => {
            let name = name.unwrap_or_else(|| config.replication.slot_name.clone());
            pg.drop_replication_slot(&name).await?;
        }
        DoCommand::EnableSync => pg.enable_sync_rep().await?,
        DoCommand::DisableSync => pg.disable_sync_rep().await?,
        DoCommand::Rewind { host, port } => {
            pg.rewind_to(&upstream(&config, host, port)).await?;
        }
        DoCommand::InitStandby { host, port } => {
            pg.init_standby(&upstream(&config, host, port)).await?;
        }
    }
    Ok(())
}

fn upstream(config: &KeeperConfig, host: String, port: u16) -> UpstreamNode {
    UpstreamNode {
        host,
        port,
        username: config.replication.username.clone(),
        password: config.replication.password.clone(),
        slot_name: config.replication.slot_name.clone(),
    }
}
