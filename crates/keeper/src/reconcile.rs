// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The periodic reconcile loop.
//!
//! One tick: honor the reload and stop flags, sleep (unless the previous
//! tick made progress), verify pid-file ownership, read the state record,
//! refresh the PostgreSQL probes, report to the monitor, reconcile or
//! transition, and persist. Fast-stop is polled at a barrier between every
//! step and exits without writing state; graceful stop finishes the tick.
//!
//! Non-fatal failures (unreachable monitor, a failed transition, an
//! unreadable state file) end the tick and are retried on the next one;
//! only a pid conflict is fatal here.

use crate::config::KeeperConfig;
use crate::env;
use crate::fsm::{self, TransitionContext};
use crate::partition::{self, NetworkHealth};
use crate::pidfile::PidGuard;
use crate::signals::SignalIntake;
use pgk_adapters::{MonitorClient, PgController};
use pgk_core::{exit_codes, Clock, KeeperError, KeeperState, NodeActiveReport, NodeState};
use pgk_storage::StateStore;
use std::time::Duration;
use tracing::{error, info, warn};

/// Outcome of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tick {
    Completed { transitioned: bool },
    /// The tick could not run to completion; nothing was persisted.
    Skipped,
    /// A fast-stop flag was observed at a barrier.
    FastStop,
}

pub struct ReconcileLoop<P, M, C> {
    config: KeeperConfig,
    store: StateStore,
    pg: P,
    monitor: M,
    clock: C,
    signals: SignalIntake,
    pid_guard: PidGuard,
    sleep_time: Duration,
    /// Last peer endpoint the monitor told us about.
    peer: Option<(String, u16)>,
}

impl<P, M, C> ReconcileLoop<P, M, C>
where
    P: PgController,
    M: MonitorClient,
    C: Clock,
{
    pub fn new(
        config: KeeperConfig,
        store: StateStore,
        pg: P,
        monitor: M,
        clock: C,
        signals: SignalIntake,
        pid_guard: PidGuard,
    ) -> Self {
        Self {
            config,
            store,
            pg,
            monitor,
            clock,
            signals,
            pid_guard,
            sleep_time: env::keeper_sleep_time(),
            peer: None,
        }
    }

    pub fn with_sleep_time(mut self, sleep_time: Duration) -> Self {
        self.sleep_time = sleep_time;
        self
    }

    /// Run until stopped. The return value is the process exit code.
    pub async fn run(mut self) -> i32 {
        let mut transitioned = false;
        loop {
            self.handle_reload();

            if self.signals.asked_to_stop() {
                info!("stop requested, leaving the reconcile loop");
                self.pid_guard.release();
                return exit_codes::QUIT;
            }

            if !transitioned {
                self.signals.sleep(self.sleep_time).await;
                if self.signals.asked_to_stop() {
                    info!("stop requested during sleep");
                    self.pid_guard.release();
                    return exit_codes::QUIT;
                }
            }

            match self.tick().await {
                Ok(Tick::Completed { transitioned: t }) => transitioned = t,
                Ok(Tick::Skipped) => transitioned = false,
                Ok(Tick::FastStop) => {
                    info!("fast stop, exiting without writing state");
                    self.pid_guard.release();
                    return exit_codes::QUIT;
                }
                Err(e) => {
                    // Fatal: the pid file is no longer ours, so neither is
                    // the state file. Do not touch anything on the way out.
                    error!(error = %e, "fatal keeper error");
                    return e.exit_code();
                }
            }
        }
    }

    /// Fold a pending SIGHUP into the running configuration.
    fn handle_reload(&mut self) {
        if self.signals.take_reload() {
            let path = self.config.paths().config;
            match self.config.reload(&path) {
                Ok(()) => info!("configuration reloaded"),
                Err(e) => warn!(error = %e, "reload failed, keeping current config"),
            }
        }
    }

    fn fast_stop(&self) -> bool {
        self.signals.asked_to_stop_fast()
    }

    /// One reconcile tick. Only fatal errors propagate.
    async fn tick(&mut self) -> Result<Tick, KeeperError> {
        self.pid_guard.check()?;

        let mut state = match self.store.read() {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "cannot read state file, skipping tick");
                return Ok(Tick::Skipped);
            }
        };
        if self.fast_stop() {
            return Ok(Tick::FastStop);
        }

        if let Err(e) = self.refresh_probes(&mut state).await {
            error!(error = %e, "postgres probe disagrees with recorded identity");
            return Ok(Tick::Skipped);
        }
        if self.fast_stop() {
            return Ok(Tick::FastStop);
        }

        let monitor_reached = self.consult_monitor(&mut state).await;
        if self.fast_stop() {
            return Ok(Tick::FastStop);
        }

        if monitor_reached && state.current_role == state.assigned_role {
            if let Err(e) = fsm::ensure_current_state(&self.pg, &mut state).await {
                warn!(error = %e, "ensure_current_state failed, retrying next tick");
            }
        }
        if self.fast_stop() {
            return Ok(Tick::FastStop);
        }

        let mut transitioned = false;
        if state.assigned_role != state.current_role {
            let ctx = TransitionContext::from_config(&self.config, self.peer.clone());
            match fsm::apply_transition(&self.pg, &mut state, &ctx).await {
                Ok(()) => {
                    transitioned = true;
                    info!(role = %state.current_role, "transition complete");
                }
                Err(e) => warn!(error = %e, "transition failed, retrying next tick"),
            }
        }
        if self.fast_stop() {
            return Ok(Tick::FastStop);
        }

        // Persist regardless of the transition outcome so the partition
        // timers keep advancing across ticks.
        if let Err(e) = self.store.write(&state) {
            warn!(error = %e, "state write failed");
        }

        Ok(Tick::Completed { transitioned })
    }

    /// Refresh the in-memory probe fields from the live instance.
    ///
    /// Individual probe failures are logged and the previous values kept; a
    /// control-file identity mismatch aborts the tick.
    async fn refresh_probes(&self, state: &mut KeeperState) -> Result<(), KeeperError> {
        match self.pg.is_running().await {
            Ok(running) => state.pg_is_running = running,
            Err(e) => {
                warn!(error = %e, "is_running probe failed, keeping previous value");
                return Ok(());
            }
        }

        if !state.pg_is_running {
            return Ok(());
        }

        match self.pg.control_data().await {
            Ok(control) => {
                state.latch_control_data(control.pg_control_version, control.system_identifier)?;
                if control.pg_version != 0 {
                    state.pg_version = control.pg_version;
                }
            }
            Err(e) => warn!(error = %e, "control data probe failed"),
        }
        if let Ok(lag) = self.pg.wal_lag_bytes().await {
            state.xlog_lag_bytes = lag;
        }
        if let Ok(sync) = self.pg.sync_state().await {
            state.sync_state = sync;
        }
        Ok(())
    }

    /// Report to the monitor and absorb its assignment; on failure run the
    /// partition check when we are primary. Returns whether the monitor was
    /// reached.
    async fn consult_monitor(&mut self, state: &mut KeeperState) -> bool {
        let now = self.clock.epoch_secs();
        let report = self.build_report(state);

        match self.monitor.node_active(&report).await {
            Ok(assignment) => {
                state.observe_monitor_contact(now);
                state.assigned_role = assignment.assigned_state;
                state.current_node_id = assignment.node_id;
                state.current_group = assignment.group_id;
                if let (Some(host), Some(port)) = (assignment.peer_host, assignment.peer_port) {
                    self.peer = Some((host, port));
                }
                true
            }
            Err(e) => {
                warn!(error = %e, "monitor unreachable");
                if state.current_role == NodeState::Primary {
                    let replica = self
                        .pg
                        .has_replica(&self.config.replication.username)
                        .await
                        .unwrap_or(false);
                    let tau = self.config.timeout.network_partition_timeout;
                    if partition::evaluate(state, now, tau, replica)
                        == NetworkHealth::Partitioned
                    {
                        state.assigned_role = NodeState::DemoteTimeout;
                    }
                }
                false
            }
        }
    }

    fn build_report(&self, state: &KeeperState) -> NodeActiveReport {
        NodeActiveReport {
            formation: self.config.pg_autoctl.formation.clone(),
            nodename: self.config.pg_autoctl.nodename.clone(),
            pgport: self.config.postgresql.pgport,
            node_id: state.current_node_id,
            group_id: state.current_group,
            current_role: state.current_role,
            pg_is_running: state.pg_is_running,
            wal_lag_bytes: state.xlog_lag_bytes,
            sync_state: state.sync_state.clone(),
        }
    }
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
