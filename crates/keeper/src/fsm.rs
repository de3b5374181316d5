// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The node state machine.
//!
//! `transition_program` is a pure table over `(from, to)` pairs: each legal
//! edge maps to an ordered program of [`Action`]s, and everything else is
//! illegal. One executor interprets the actions against the PgController.
//! `current_role` only advances after the whole program succeeded, so a
//! failed step leaves the keeper where it was and the reconcile loop
//! retries on its next tick.

use crate::config::KeeperConfig;
use pgk_adapters::{PgController, UpstreamNode};
use pgk_core::{KeeperError, KeeperState, NodeState};
use tracing::{debug, info};

use NodeState::*;

/// A standby whose streaming lag is at or under this many bytes counts as
/// caught up and may report `secondary`.
pub const MAX_CATCHUP_LAG_BYTES: u64 = 16 * 1024;

/// One step of a transition program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Start PostgreSQL if it is not already running.
    StartPostgres,
    /// Stop PostgreSQL if it is running. The data directory stays intact.
    StopPostgres,
    AddDefaultSettings,
    /// Create the monitor's health-check user and open hba for it.
    CreateMonitorUser,
    CreateReplicationSlot,
    DropReplicationSlot,
    CreateReplicationUser,
    /// Open replication access for the peer standby.
    AddStandbyToHba,
    EnableSyncRep,
    DisableSyncRep,
    Promote,
    /// Rewind the data directory against the peer primary and reconfigure
    /// as its standby.
    Rewind,
    /// Clone the peer primary with a base backup.
    InitStandby,
    /// Fail (and retry next tick) until streaming lag is under the
    /// catch-up threshold.
    AwaitCaughtUp,
}

/// The legal transitions and their action programs.
///
/// `None` means the edge does not exist; attempting it is an error and
/// mutates nothing. Same-state pairs are intentionally absent: holding a
/// role is `ensure_current_state`'s business, not a transition.
pub fn transition_program(from: NodeState, to: NodeState) -> Option<&'static [Action]> {
    use Action::*;
    match (from, to) {
        // bootstrap
        (Init, Single) => Some(&[StartPostgres, AddDefaultSettings, CreateMonitorUser]),
        (Init, WaitStandby) => Some(&[]),

        // a standby joins: the primary side opens replication
        (Single, WaitPrimary) => Some(&[
            CreateReplicationSlot,
            CreateReplicationUser,
            AddStandbyToHba,
        ]),
        (WaitPrimary, Primary) => Some(&[EnableSyncRep]),
        (WaitPrimary, Single) => Some(&[DropReplicationSlot]),
        // a fresh standby joins an established primary
        (Primary, WaitPrimary) => Some(&[
            DisableSyncRep,
            CreateReplicationSlot,
            CreateReplicationUser,
            AddStandbyToHba,
        ]),
        (Primary, Single) => Some(&[DisableSyncRep, DropReplicationSlot]),

        // the standby side bootstraps and catches up
        (WaitStandby, Catchingup) => Some(&[InitStandby, StartPostgres]),
        (Catchingup, Secondary) => Some(&[AwaitCaughtUp]),
        (Secondary, Catchingup) => Some(&[]),

        // demotion
        (Primary, Draining) => Some(&[DisableSyncRep]),
        (Draining, Demoted) => Some(&[StopPostgres]),
        (Primary, Demoted) => Some(&[DisableSyncRep, StopPostgres]),
        (Primary, DemoteTimeout) => Some(&[StopPostgres]),
        (Draining, DemoteTimeout) => Some(&[StopPostgres]),

        // rejoin after demotion
        (Demoted, Catchingup) => Some(&[Rewind, StartPostgres]),
        (DemoteTimeout, Catchingup) => Some(&[Rewind, StartPostgres]),

        // promotion of a standby
        (Secondary, PrepPromotion) => Some(&[]),
        (Secondary, StopReplication) => Some(&[]),
        (PrepPromotion, StopReplication) => Some(&[]),
        (PrepPromotion, StandbyPromoted) => Some(&[Promote]),
        (StopReplication, StandbyPromoted) => Some(&[Promote]),
        (StandbyPromoted, Primary) => Some(&[
            CreateReplicationSlot,
            CreateReplicationUser,
            AddStandbyToHba,
        ]),

        // maintenance
        (Single, Maintenance) => Some(&[StopPostgres]),
        (WaitPrimary, Maintenance) => Some(&[StopPostgres]),
        (Primary, Maintenance) => Some(&[DisableSyncRep, StopPostgres]),
        (Catchingup, Maintenance) => Some(&[StopPostgres]),
        (Secondary, Maintenance) => Some(&[StopPostgres]),
        (Demoted, Maintenance) => Some(&[]),
        (DemoteTimeout, Maintenance) => Some(&[]),
        (Maintenance, Single) => Some(&[StartPostgres]),
        (Maintenance, Primary) => Some(&[StartPostgres]),
        (Maintenance, Catchingup) => Some(&[StartPostgres]),
        (Maintenance, Secondary) => Some(&[StartPostgres, AwaitCaughtUp]),

        _ => None,
    }
}

/// Everything an action program may need besides the adapters.
#[derive(Debug, Clone)]
pub struct TransitionContext {
    pub replication_slot: String,
    pub replication_user: String,
    pub replication_password: String,
    pub monitor_host: String,
    pub auth_method: String,
    /// The other node of the group, as last told by the monitor.
    pub peer: Option<UpstreamNode>,
}

impl TransitionContext {
    pub fn from_config(config: &KeeperConfig, peer: Option<(String, u16)>) -> Self {
        Self {
            replication_slot: config.replication.slot_name.clone(),
            replication_user: config.replication.username.clone(),
            replication_password: config.replication.password.clone(),
            monitor_host: config.monitor_host(),
            auth_method: config.postgresql.auth_method.clone(),
            peer: peer.map(|(host, port)| UpstreamNode {
                host,
                port,
                username: config.replication.username.clone(),
                password: config.replication.password.clone(),
                slot_name: config.replication.slot_name.clone(),
            }),
        }
    }
}

/// Drive the transition from `state.current_role` to `state.assigned_role`.
///
/// On success `current_role` becomes the assigned role. On any step failure
/// the state is unchanged apart from probe refreshes and the error names the
/// failed step.
pub async fn apply_transition(
    pg: &impl PgController,
    state: &mut KeeperState,
    ctx: &TransitionContext,
) -> Result<(), KeeperError> {
    let from = state.current_role;
    let to = state.assigned_role;

    let Some(program) = transition_program(from, to) else {
        return Err(KeeperError::TransitionFailure {
            from,
            to,
            reason: "no such transition".to_string(),
        });
    };

    info!(%from, %to, steps = program.len(), "transition");
    for action in program {
        debug!(?action, "transition step");
        run_action(*action, pg, state, ctx)
            .await
            .map_err(|reason| KeeperError::TransitionFailure {
                from,
                to,
                reason: format!("{action:?}: {reason}"),
            })?;
    }

    state.current_role = to;
    Ok(())
}

async fn run_action(
    action: Action,
    pg: &impl PgController,
    state: &mut KeeperState,
    ctx: &TransitionContext,
) -> Result<(), String> {
    match action {
        Action::StartPostgres => {
            if !pg.is_running().await.map_err(|e| e.to_string())? {
                pg.start().await.map_err(|e| e.to_string())?;
            }
            state.pg_is_running = true;
            Ok(())
        }
        Action::StopPostgres => {
            if pg.is_running().await.map_err(|e| e.to_string())? {
                pg.stop().await.map_err(|e| e.to_string())?;
            }
            state.pg_is_running = false;
            Ok(())
        }
        Action::AddDefaultSettings => pg
            .add_default_settings()
            .await
            .map_err(|e| e.to_string()),
        Action::CreateMonitorUser => pg
            .create_monitor_user(&ctx.monitor_host, &ctx.auth_method)
            .await
            .map_err(|e| e.to_string()),
        Action::CreateReplicationSlot => pg
            .create_replication_slot(&ctx.replication_slot)
            .await
            .map_err(|e| e.to_string()),
        Action::DropReplicationSlot => pg
            .drop_replication_slot(&ctx.replication_slot)
            .await
            .map_err(|e| e.to_string()),
        Action::CreateReplicationUser => pg
            .create_replication_user(&ctx.replication_user, &ctx.replication_password)
            .await
            .map_err(|e| e.to_string()),
        Action::AddStandbyToHba => {
            let peer = ctx.peer.as_ref().ok_or("no peer node known yet")?;
            pg.add_standby_to_hba(&peer.host, &ctx.replication_user)
                .await
                .map_err(|e| e.to_string())
        }
        Action::EnableSyncRep => pg.enable_sync_rep().await.map_err(|e| e.to_string()),
        Action::DisableSyncRep => pg.disable_sync_rep().await.map_err(|e| e.to_string()),
        Action::Promote => pg.promote().await.map_err(|e| e.to_string()),
        Action::Rewind => {
            let peer = ctx.peer.as_ref().ok_or("no peer node known yet")?;
            pg.rewind_to(peer).await.map_err(|e| e.to_string())
        }
        Action::InitStandby => {
            let peer = ctx.peer.as_ref().ok_or("no peer node known yet")?;
            pg.init_standby(peer).await.map_err(|e| e.to_string())
        }
        Action::AwaitCaughtUp => {
            let lag = pg.wal_lag_bytes().await.map_err(|e| e.to_string())?;
            state.xlog_lag_bytes = lag;
            if lag > MAX_CATCHUP_LAG_BYTES {
                Err(format!(
                    "wal lag {lag} bytes still above {MAX_CATCHUP_LAG_BYTES}"
                ))
            } else {
                Ok(())
            }
        }
    }
}

/// Idempotent side-effect reconciliation for a settled role.
///
/// Runs when `current_role == assigned_role`: the only drift worth
/// correcting is PostgreSQL running (or not) against the role's
/// expectation.
pub async fn ensure_current_state(
    pg: &impl PgController,
    state: &mut KeeperState,
) -> Result<(), KeeperError> {
    let should_run = state.current_role.expects_postgres_running();
    let running = pg
        .is_running()
        .await
        .map_err(|e| KeeperError::PgControllerFailure(e.to_string()))?;

    if should_run && !running {
        info!(role = %state.current_role, "postgres should be running, starting it");
        pg.start()
            .await
            .map_err(|e| KeeperError::PgControllerFailure(e.to_string()))?;
        state.pg_is_running = true;
    } else if !should_run && running {
        info!(role = %state.current_role, "postgres should be stopped, stopping it");
        pg.stop()
            .await
            .map_err(|e| KeeperError::PgControllerFailure(e.to_string()))?;
        state.pg_is_running = false;
    } else {
        state.pg_is_running = running;
    }
    Ok(())
}

#[cfg(test)]
#[path = "fsm_tests.rs"]
mod tests;
