// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PID-file discipline for the keeper service.
//!
//! Exactly one keeper may drive a data directory. The guard takes an
//! exclusive lock on `pg_autoctl.pid` at startup and writes its PID; every
//! reconcile tick then re-reads the file and compares it to the PID the
//! service started with. A missing file or a foreign PID means an operator
//! (or a second keeper) interfered, and the only safe move is to exit
//! immediately without touching state.

use fs2::FileExt;
use pgk_core::KeeperError;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct PidGuard {
    path: PathBuf,
    start_pid: u32,
    // NOTE(lifetime): held to maintain the exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
}

impl PidGuard {
    /// Lock the pid file and record our PID in it.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, KeeperError> {
        let path = path.into();
        Self::acquire_as(path, std::process::id())
    }

    /// Like [`acquire`](Self::acquire) with an explicit PID (tests).
    pub fn acquire_as(path: PathBuf, start_pid: u32) -> Result<Self, KeeperError> {
        // Open without truncating so a failed lock attempt cannot wipe the
        // running keeper's PID.
        let lock_file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| KeeperError::PidConflict(format!("{}: {e}", path.display())))?;
        lock_file.try_lock_exclusive().map_err(|_| {
            let owner = read_pid(&path)
                .map(|pid| pid.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            KeeperError::PidConflict(format!(
                "another keeper (pid {owner}) owns {}",
                path.display()
            ))
        })?;

        let mut lock_file = lock_file;
        lock_file
            .set_len(0)
            .and_then(|()| writeln!(lock_file, "{start_pid}"))
            .and_then(|()| lock_file.sync_all())
            .map_err(|e| KeeperError::PidConflict(format!("{}: {e}", path.display())))?;

        Ok(Self {
            path,
            start_pid,
            lock_file,
        })
    }

    pub fn start_pid(&self) -> u32 {
        self.start_pid
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Per-tick ownership check.
    pub fn check(&self) -> Result<(), KeeperError> {
        match read_pid(&self.path) {
            Some(pid) if pid == self.start_pid => Ok(()),
            Some(pid) => Err(KeeperError::PidConflict(format!(
                "{} now names pid {pid}, we are {}",
                self.path.display(),
                self.start_pid
            ))),
            None => Err(KeeperError::PidConflict(format!(
                "{} is missing or unreadable",
                self.path.display()
            ))),
        }
    }

    /// Remove the pid file on clean exit.
    pub fn release(self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn read_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|s| s.trim().parse::<u32>().ok())
}

#[cfg(test)]
#[path = "pidfile_tests.rs"]
mod tests;
