// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide signal intake.
//!
//! Signals land asynchronously and are published as flags; the reconcile
//! loop polls the flags at its named barriers, so no operation is ever
//! cancelled mid-flight. `SIGHUP` asks for a config reload, `SIGTERM` for a
//! graceful stop (finish the tick), `SIGINT`/`SIGQUIT` for a fast stop
//! (exit at the next barrier without writing state).

use pgk_core::KeeperError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tracing::info;

#[derive(Default)]
struct IntakeFlags {
    asked_to_reload: AtomicBool,
    asked_to_stop: AtomicBool,
    asked_to_stop_fast: AtomicBool,
    notify: Notify,
}

#[derive(Clone, Default)]
pub struct SignalIntake {
    flags: Arc<IntakeFlags>,
}

impl SignalIntake {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the process signal handlers feeding this intake.
    pub fn install(&self) -> Result<(), KeeperError> {
        let mut sighup = stream(SignalKind::hangup())?;
        let mut sigterm = stream(SignalKind::terminate())?;
        let mut sigint = stream(SignalKind::interrupt())?;
        let mut sigquit = stream(SignalKind::quit())?;

        let intake = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = sighup.recv() => {
                        info!("received SIGHUP, scheduling config reload");
                        intake.request_reload();
                    }
                    _ = sigterm.recv() => {
                        info!("received SIGTERM, stopping after this tick");
                        intake.request_stop();
                    }
                    _ = sigint.recv() => {
                        info!("received SIGINT, fast stop");
                        intake.request_stop_fast();
                    }
                    _ = sigquit.recv() => {
                        info!("received SIGQUIT, fast stop");
                        intake.request_stop_fast();
                    }
                }
            }
        });
        Ok(())
    }

    /// Consume a pending reload request.
    pub fn take_reload(&self) -> bool {
        self.flags.asked_to_reload.swap(false, Ordering::SeqCst)
    }

    pub fn asked_to_stop(&self) -> bool {
        self.flags.asked_to_stop.load(Ordering::SeqCst)
            || self.asked_to_stop_fast()
    }

    pub fn asked_to_stop_fast(&self) -> bool {
        self.flags.asked_to_stop_fast.load(Ordering::SeqCst)
    }

    pub fn request_reload(&self) {
        self.flags.asked_to_reload.store(true, Ordering::SeqCst);
        self.flags.notify.notify_waiters();
    }

    pub fn request_stop(&self) {
        self.flags.asked_to_stop.store(true, Ordering::SeqCst);
        self.flags.notify.notify_waiters();
    }

    pub fn request_stop_fast(&self) {
        self.flags.asked_to_stop_fast.store(true, Ordering::SeqCst);
        self.flags.notify.notify_waiters();
    }

    /// Sleep that wakes early when any signal arrives.
    pub async fn sleep(&self, duration: Duration) {
        tokio::select! {
            () = tokio::time::sleep(duration) => {}
            () = self.flags.notify.notified() => {}
        }
    }
}

fn stream(kind: SignalKind) -> Result<tokio::signal::unix::Signal, KeeperError> {
    signal(kind).map_err(|e| KeeperError::InternalError(format!("signal handler: {e}")))
}

#[cfg(test)]
#[path = "signals_tests.rs"]
mod tests;
