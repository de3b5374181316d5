// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `pgk show {uri|events|state}`

use super::{load_config, monitor_client};
use crate::exit_error::ExitError;
use clap::Subcommand;
use pgk_adapters::MonitorClient;
use pgk_core::KeeperState;
use pgk_storage::StateStore;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum ShowCommand {
    /// Print the connection URI for this formation
    Uri,

    /// Print the monitor's recent events for this formation
    Events {
        /// How many events to fetch
        #[arg(long, default_value_t = 10)]
        count: usize,
    },

    /// Print the local keeper state record
    State,
}

pub async fn run(cmd: ShowCommand, pgdata: Option<PathBuf>) -> Result<(), ExitError> {
    let config = load_config(pgdata)?;
    match cmd {
        ShowCommand::Uri => {
            let uri = monitor_client(&config)
                .formation_uri(&config.pg_autoctl.formation)
                .await?;
            println!("{uri}");
        }
        ShowCommand::Events { count } => {
            let events = monitor_client(&config)
                .last_events(&config.pg_autoctl.formation, count)
                .await?;
            for event in events {
                println!("{event}");
            }
        }
        ShowCommand::State => {
            let state = StateStore::new(&config.paths().state).read()?;
            print_state(&state);
        }
    }
    Ok(())
}

fn print_state(state: &KeeperState) {
    println!("Current Role:             {}", state.current_role);
    println!("Assigned Role:            {}", state.assigned_role);
    println!("Node Id:                  {}", state.current_node_id);
    println!("Group:                    {}", state.current_group);
    println!("PostgreSQL Running:       {}", state.pg_is_running);
    println!("PostgreSQL Version:       {}", state.pg_version);
    println!("Control Version:          {}", state.pg_control_version);
    println!("System Identifier:        {}", state.system_identifier);
    println!("WAL Lag (bytes):          {}", state.xlog_lag_bytes);
    println!("Sync State:               {}", state.sync_state);
    println!("Last Monitor Contact:     {}", state.last_monitor_contact);
    println!("Last Secondary Contact:   {}", state.last_secondary_contact);
}
