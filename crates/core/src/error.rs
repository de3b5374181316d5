// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error kinds shared across the keeper.
//!
//! The logger is an observer here, never the error channel: every failure is
//! a value of this type, and callers decide between "fatal, exit with the
//! kind's code" and "log, end the tick, retry".

use crate::exit_codes;
use crate::node_state::NodeState;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeeperError {
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("state file is corrupt: {0}")]
    StateCorrupt(String),

    #[error("pid file conflict: {0}")]
    PidConflict(String),

    #[error("postgres controller failure: {0}")]
    PgControllerFailure(String),

    #[error("monitor is unreachable: {0}")]
    MonitorUnreachable(String),

    #[error("transition from {from} to {to} failed: {reason}")]
    TransitionFailure {
        from: NodeState,
        to: NodeState,
        reason: String,
    },

    #[error("internal error: {0}")]
    InternalError(String),
}

impl KeeperError {
    /// Fatal kinds terminate the service; everything else is retried on the
    /// next tick.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            KeeperError::PidConflict(_) | KeeperError::InternalError(_)
        )
    }

    /// Stable process exit code for this kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            KeeperError::ConfigInvalid(_) => exit_codes::BAD_CONFIG,
            KeeperError::StateCorrupt(_) => exit_codes::BAD_STATE,
            KeeperError::PidConflict(_) => exit_codes::QUIT,
            KeeperError::PgControllerFailure(_) => exit_codes::PGCTL,
            KeeperError::MonitorUnreachable(_) => exit_codes::MONITOR,
            KeeperError::TransitionFailure { .. } => exit_codes::BAD_STATE,
            KeeperError::InternalError(_) => exit_codes::INTERNAL_ERROR,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
