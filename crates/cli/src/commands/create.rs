// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `pgk create {postgres|monitor|formation}`

use super::{load_config, monitor_client};
use crate::exit_error::ExitError;
use clap::Subcommand;
use pgk_adapters::MonitorClient;
use pgk_core::{KeeperState, NodeState};
use pgk_keeper::{KeeperConfig, NodeKind};
use pgk_storage::{init_marker, StateStore};
use std::path::PathBuf;
use tracing::info;

#[derive(Subcommand)]
pub enum CreateCommand {
    /// Initialize this node as a keeper and register it with the monitor
    Postgres {
        /// Formation to join
        #[arg(long, default_value = "default")]
        formation: String,

        /// Name other nodes and the monitor reach us by
        #[arg(long)]
        nodename: String,

        /// Connection URI of the monitor
        #[arg(long)]
        monitor: String,
    },

    /// Write a monitor-role configuration for this data directory
    Monitor {
        /// Connection URI the keepers will use to reach this monitor
        #[arg(long)]
        uri: String,
    },

    /// Create a formation on the monitor
    Formation {
        /// Name of the new formation
        name: String,
    },
}

pub async fn run(cmd: CreateCommand, pgdata: Option<PathBuf>) -> Result<(), ExitError> {
    match cmd {
        CreateCommand::Postgres {
            formation,
            nodename,
            monitor,
        } => create_postgres(pgdata, formation, nodename, monitor).await,
        CreateCommand::Monitor { uri } => create_monitor(pgdata, uri),
        CreateCommand::Formation { name } => {
            let config = load_config(pgdata)?;
            monitor_client(&config).create_formation(&name).await?;
            println!("formation {name} created");
            Ok(())
        }
    }
}

async fn create_postgres(
    pgdata: Option<PathBuf>,
    formation: String,
    nodename: String,
    monitor: String,
) -> Result<(), ExitError> {
    let pgdata = crate::resolve_pgdata(pgdata)?;
    std::fs::create_dir_all(&pgdata)
        .map_err(|e| ExitError::bad_state(format!("cannot create {}: {e}", pgdata.display())))?;

    let config = KeeperConfig::seed(pgdata, formation.clone(), nodename.clone(), monitor);
    let paths = config.paths();
    let store = StateStore::new(&paths.state);

    if store.exists() && !init_marker::exists(&paths.init) {
        return Err(ExitError::bad_state(
            "this data directory is already registered; drop the node first",
        ));
    }

    config.save(&paths.config)?;

    // The marker stays in place until registration and the first state
    // record both landed, so an interrupted create is detectable.
    init_marker::create(&paths.init)
        .map_err(|e| ExitError::bad_state(format!("cannot write init marker: {e}")))?;

    let assignment = monitor_client(&config)
        .register(&formation, &nodename, config.postgresql.pgport, NodeState::Init)
        .await?;

    let state = KeeperState {
        current_node_id: assignment.node_id,
        current_group: assignment.group_id,
        assigned_role: assignment.assigned_state,
        ..KeeperState::default()
    };
    store.write(&state)?;

    init_marker::remove(&paths.init)
        .map_err(|e| ExitError::bad_state(format!("cannot remove init marker: {e}")))?;

    info!(
        node_id = assignment.node_id,
        group = assignment.group_id,
        "node registered"
    );
    println!(
        "registered as node {} in group {} of formation {formation}, assigned state {}",
        assignment.node_id, assignment.group_id, assignment.assigned_state
    );
    Ok(())
}

fn create_monitor(pgdata: Option<PathBuf>, uri: String) -> Result<(), ExitError> {
    let pgdata = crate::resolve_pgdata(pgdata)?;
    std::fs::create_dir_all(&pgdata)
        .map_err(|e| ExitError::bad_state(format!("cannot create {}: {e}", pgdata.display())))?;

    let mut config = KeeperConfig::seed(
        pgdata,
        "monitor".to_string(),
        "monitor".to_string(),
        uri,
    );
    config.pg_autoctl.role = NodeKind::Monitor;
    config.save(&config.paths().config)?;

    println!("monitor configuration written; install the pgautofailover extension to finish");
    Ok(())
}
