// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `pgk config {get|set}`
//!
//! Keys are `section.field` (e.g. `timeout.network_partition_timeout`).
//! `set` edits the file and re-validates it as a whole keeper configuration
//! before writing, so a typo can never leave an unparseable file behind.

use crate::exit_error::ExitError;
use clap::Subcommand;
use pgk_keeper::KeeperConfig;
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print one setting, or the whole file without a key
    Get {
        /// Setting name as section.field
        key: Option<String>,
    },

    /// Change one setting in the configuration file
    Set {
        /// Setting name as section.field
        key: String,
        value: String,
    },
}

pub fn run(cmd: ConfigCommand, pgdata: Option<PathBuf>) -> Result<(), ExitError> {
    let pgdata = crate::resolve_pgdata(pgdata)?;
    let config_path = pgk_keeper::KeeperPaths::under(&pgdata).config;

    match cmd {
        ConfigCommand::Get { key: None } => {
            let text = std::fs::read_to_string(&config_path)
                .map_err(|e| ExitError::bad_state(format!("{}: {e}", config_path.display())))?;
            print!("{text}");
            Ok(())
        }
        ConfigCommand::Get { key: Some(key) } => {
            let value = read_key(&config_path, &key)?;
            println!("{value}");
            Ok(())
        }
        ConfigCommand::Set { key, value } => {
            write_key(&config_path, &key, &value)?;
            println!("{key} = {value}");
            Ok(())
        }
    }
}

fn parse_file(path: &Path) -> Result<toml::Value, ExitError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ExitError::bad_state(format!("{}: {e}", path.display())))?;
    text.parse::<toml::Value>()
        .map_err(|e| ExitError::bad_state(format!("{}: {e}", path.display())))
}

/// Look up `section.field` in the config file.
fn read_key(path: &Path, key: &str) -> Result<String, ExitError> {
    let value = parse_file(path)?;
    let Some((section, field)) = key.split_once('.') else {
        return Err(ExitError::bad_args(format!(
            "key must be section.field, got {key:?}"
        )));
    };
    value
        .get(section)
        .and_then(|s| s.get(field))
        .map(display_value)
        .ok_or_else(|| ExitError::bad_args(format!("unknown setting {key:?}")))
}

/// Change `section.field`, validating the result parses as a keeper config.
fn write_key(path: &Path, key: &str, raw: &str) -> Result<(), ExitError> {
    let mut value = parse_file(path)?;
    let Some((section, field)) = key.split_once('.') else {
        return Err(ExitError::bad_args(format!(
            "key must be section.field, got {key:?}"
        )));
    };

    let slot = value
        .get_mut(section)
        .and_then(|s| s.get_mut(field))
        .ok_or_else(|| ExitError::bad_args(format!("unknown setting {key:?}")))?;
    *slot = coerce(slot, raw);

    let text =
        toml::to_string_pretty(&value).map_err(|e| ExitError::bad_state(e.to_string()))?;
    // Re-validate the whole document before touching the file.
    toml::from_str::<KeeperConfig>(&text)
        .map_err(|e| ExitError::bad_args(format!("{key} = {raw:?} is not valid: {e}")))?;
    std::fs::write(path, text)
        .map_err(|e| ExitError::bad_state(format!("{}: {e}", path.display())))?;
    Ok(())
}

/// Keep the existing type of the setting where possible.
fn coerce(current: &toml::Value, raw: &str) -> toml::Value {
    match current {
        toml::Value::Integer(_) => raw
            .parse::<i64>()
            .map(toml::Value::Integer)
            .unwrap_or_else(|_| toml::Value::String(raw.to_string())),
        toml::Value::Boolean(_) => raw
            .parse::<bool>()
            .map(toml::Value::Boolean)
            .unwrap_or_else(|_| toml::Value::String(raw.to_string())),
        _ => toml::Value::String(raw.to_string()),
    }
}

fn display_value(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
