// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service supervision.
//!
//! One process, two supervised tasks: the reconcile loop (the sole writer
//! of the state file) and the HTTP status server (a reader). The design
//! invariant is one writer plus atomically-published snapshots, so tasks
//! in a shared address space are as safe as forked children here.
//!
//! Policy lives in this module, not in the children: a crashed status
//! server is restarted a bounded number of times, and the whole service
//! exits with the reconcile loop's exit code.

use crate::config::KeeperConfig;
use crate::httpd::{self, RequestCtx};
use crate::pidfile::PidGuard;
use crate::reconcile::ReconcileLoop;
use crate::signals::SignalIntake;
use pgk_adapters::{PgCtlController, PsqlMonitorClient};
use pgk_core::{exit_codes, SystemClock};
use pgk_storage::StateStore;
use std::time::Duration;
use tracing::{error, warn};

/// How often the supervisor restarts a crashed status server before giving
/// up on it (the reconcile loop keeps running either way).
pub const MAX_HTTPD_RESTARTS: u32 = 5;

/// Run the keeper service until it is asked to stop. Returns the process
/// exit code.
pub async fn run_service(config: KeeperConfig) -> i32 {
    let paths = config.paths();

    let pid_guard = match PidGuard::acquire(&paths.pid) {
        Ok(guard) => guard,
        Err(e) => {
            error!(error = %e, "cannot acquire pid file");
            return e.exit_code();
        }
    };

    let signals = SignalIntake::new();
    if let Err(e) = signals.install() {
        error!(error = %e, "cannot install signal handlers");
        return e.exit_code();
    }

    let pg = PgCtlController::new(&config.postgresql.pgdata, config.postgresql.pgport);
    let monitor = PsqlMonitorClient::new(
        &config.pg_autoctl.monitor_uri,
        Duration::from_secs(config.timeout.monitor_call_timeout),
    );
    let store = StateStore::new(&paths.state);

    let keeper = ReconcileLoop::new(
        config.clone(),
        store,
        pg,
        monitor,
        SystemClock,
        signals.clone(),
        pid_guard,
    );
    let reconcile = tokio::spawn(keeper.run());

    let httpd_ctx = RequestCtx {
        config_path: paths.config.clone(),
        state_path: paths.state.clone(),
    };
    let listen_address = config.httpd.listen_address.clone();
    let listen_port = config.httpd.port;
    let status_server = tokio::spawn(async move {
        let mut restarts = 0u32;
        loop {
            match httpd::serve(&listen_address, listen_port, httpd_ctx.clone()).await {
                Ok(()) => break,
                Err(e) if restarts < MAX_HTTPD_RESTARTS => {
                    restarts += 1;
                    warn!(error = %e, restarts, "status server failed, restarting");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
                Err(e) => {
                    error!(error = %e, "status server failed too often, giving up on it");
                    break;
                }
            }
        }
    });

    // The reconcile loop decides when the service is over.
    let code = match reconcile.await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "reconcile task aborted");
            exit_codes::INTERNAL_ERROR
        }
    };
    status_server.abort();
    code
}
