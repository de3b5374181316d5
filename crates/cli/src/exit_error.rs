// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Custom error type that carries a process exit code.
//!
//! Commands return `ExitError` instead of calling `std::process::exit()`
//! directly, allowing `main()` to handle process termination.

use pgk_adapters::{MonitorError, PgError};
use pgk_core::{exit_codes, KeeperError};
use pgk_storage::StateStoreError;
use std::fmt;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn bad_args(message: impl Into<String>) -> Self {
        Self::new(exit_codes::BAD_ARGS, message)
    }

    pub fn bad_state(message: impl Into<String>) -> Self {
        Self::new(exit_codes::BAD_STATE, message)
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}

impl From<KeeperError> for ExitError {
    fn from(err: KeeperError) -> Self {
        Self::new(err.exit_code(), err.to_string())
    }
}

impl From<MonitorError> for ExitError {
    fn from(err: MonitorError) -> Self {
        Self::new(exit_codes::MONITOR, err.to_string())
    }
}

impl From<PgError> for ExitError {
    fn from(err: PgError) -> Self {
        let code = match &err {
            PgError::Sql { .. } => exit_codes::PGSQL,
            _ => exit_codes::PGCTL,
        };
        Self::new(code, err.to_string())
    }
}

impl From<StateStoreError> for ExitError {
    fn from(err: StateStoreError) -> Self {
        Self::new(exit_codes::BAD_STATE, err.to_string())
    }
}

#[cfg(test)]
#[path = "exit_error_tests.rs"]
mod tests;
