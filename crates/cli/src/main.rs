// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! pgk: PostgreSQL automated-failover keeper CLI.
//!
//! One binary: operator commands (`create`, `drop`, `show`, `config`,
//! `enable`, `disable`, `do`) plus the long-running `run` service and the
//! `stop`/`reload` signal senders.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod commands;
mod exit_error;

use clap::{Parser, Subcommand};
use exit_error::ExitError;
use pgk_core::exit_codes;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "pgk",
    version,
    about = "Manage a PostgreSQL node in an automated-failover formation"
)]
struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short = 'q', long = "quiet", global = true)]
    quiet: bool,

    /// PostgreSQL data directory (defaults to $PGDATA)
    #[arg(long, global = true)]
    pgdata: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a keeper node, a monitor, or a formation
    #[command(subcommand)]
    Create(commands::create::CreateCommand),

    /// Remove a node or a formation
    #[command(subcommand)]
    Drop(commands::drop::DropCommand),

    /// Inspect the formation and the local state
    #[command(subcommand)]
    Show(commands::show::ShowCommand),

    /// Read or change the keeper configuration file
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Enable a formation or node property
    #[command(subcommand)]
    Enable(commands::enable::EnableCommand),

    /// Disable a formation or node property
    #[command(subcommand)]
    Disable(commands::enable::DisableCommand),

    /// Low-level PostgreSQL primitives, one at a time
    #[command(subcommand)]
    Do(commands::do_cmd::DoCommand),

    /// Run the keeper service for this data directory
    Run,

    /// Stop the running keeper service (SIGTERM)
    Stop,

    /// Ask the running keeper to reload its configuration (SIGHUP)
    Reload,

    /// Print version information
    Version,
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help/--version land here too; only real parse errors are
            // BAD_ARGS.
            let is_error = e.use_stderr();
            let _ = e.print();
            std::process::exit(if is_error {
                exit_codes::BAD_ARGS
            } else {
                exit_codes::OK
            });
        }
    };

    let _log_guard = setup_logging(&cli);

    match dispatch(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("pgk: {}", e.message);
            std::process::exit(e.code);
        }
    }
}

async fn dispatch(cli: Cli) -> Result<i32, ExitError> {
    match cli.command {
        Command::Create(cmd) => commands::create::run(cmd, cli.pgdata).await?,
        Command::Drop(cmd) => commands::drop::run(cmd, cli.pgdata).await?,
        Command::Show(cmd) => commands::show::run(cmd, cli.pgdata).await?,
        Command::Config(cmd) => commands::config::run(cmd, cli.pgdata)?,
        Command::Enable(cmd) => commands::enable::run_enable(cmd, cli.pgdata).await?,
        Command::Disable(cmd) => commands::enable::run_disable(cmd, cli.pgdata).await?,
        Command::Do(cmd) => commands::do_cmd::run(cmd, cli.pgdata).await?,
        Command::Run => return commands::service::run(cli.pgdata).await,
        Command::Stop => commands::service::stop(cli.pgdata)?,
        Command::Reload => commands::service::reload(cli.pgdata)?,
        Command::Version => commands::service::version(),
    }
    Ok(exit_codes::OK)
}

/// Resolve the data directory from `--pgdata` or the PGDATA environment.
fn resolve_pgdata(flag: Option<PathBuf>) -> Result<PathBuf, ExitError> {
    flag.or_else(|| std::env::var_os("PGDATA").map(PathBuf::from))
        .ok_or_else(|| ExitError::bad_args("no --pgdata given and PGDATA is not set"))
}

fn setup_logging(cli: &Cli) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // The service logs to a file next to PGDATA as well; one-shot commands
    // only log to stderr.
    let file_layer = if matches!(cli.command, Command::Run) {
        resolve_pgdata(cli.pgdata.clone())
            .ok()
            .map(|pgdata| pgk_keeper::KeeperPaths::under(&pgdata).log)
    } else {
        None
    };

    match file_layer {
        Some(log_path) => {
            rotate_log_if_needed(&log_path);
            let dir = log_path
                .parent()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            let name = log_path
                .file_name()
                .map(std::ffi::OsString::from)
                .unwrap_or_else(|| "pg_autoctl.log".into());
            let appender = tracing_appender::rolling::never(dir, name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
            None
        }
    }
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep.
const MAX_ROTATED_LOGS: u32 = 3;

/// Shift `pg_autoctl.log` → `.1` → `.2` → `.3` when the live file grows
/// past [`MAX_LOG_SIZE`]. Best-effort: a failed rotation never blocks the
/// service from starting.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}
