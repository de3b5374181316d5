// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `pgk drop {node|formation}`

use super::{load_config, monitor_client};
use crate::exit_error::ExitError;
use clap::Subcommand;
use pgk_adapters::MonitorClient;
use pgk_storage::{init_marker, StateStore};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum DropCommand {
    /// Remove this node from its formation and delete its local state
    Node,

    /// Drop a formation on the monitor
    Formation {
        /// Name of the formation to drop
        name: String,
    },
}

pub async fn run(cmd: DropCommand, pgdata: Option<PathBuf>) -> Result<(), ExitError> {
    match cmd {
        DropCommand::Node => drop_node(pgdata).await,
        DropCommand::Formation { name } => {
            let config = load_config(pgdata)?;
            monitor_client(&config).drop_formation(&name).await?;
            println!("formation {name} dropped");
            Ok(())
        }
    }
}

async fn drop_node(pgdata: Option<PathBuf>) -> Result<(), ExitError> {
    let config = load_config(pgdata)?;
    let paths = config.paths();

    if paths.pid.exists() {
        return Err(ExitError::bad_state(
            "a keeper is still running for this data directory; run `pgk stop` first",
        ));
    }

    let store = StateStore::new(&paths.state);
    match store.read() {
        Ok(state) => {
            monitor_client(&config)
                .remove(state.current_node_id, state.current_group)
                .await?;
        }
        // No usable state record: nothing to tell the monitor about.
        Err(e) => eprintln!("pgk: skipping monitor removal: {e}"),
    }

    store.remove()?;
    init_marker::remove(&paths.init)
        .map_err(|e| ExitError::bad_state(format!("cannot remove init marker: {e}")))?;

    // The configuration is kept so the operator can re-create the node.
    println!("node dropped; data directory and configuration left in place");
    Ok(())
}
