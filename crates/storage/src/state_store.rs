// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash-atomic storage for the keeper state record.
//!
//! The record is a fixed-layout little-endian binary block whose first field
//! is a file-format version. Writes go to a sibling temp file which is
//! fsync'd and renamed over the live file, then the directory is fsync'd, so
//! a reader observes either the previous record or the new one in full and
//! never a torn mix.

use pgk_core::{KeeperError, KeeperState, NodeState, SYNC_STATE_LEN};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// On-disk format version. Readers reject anything else.
pub const FILE_VERSION: u32 = 1;

/// Exact byte length of a serialized record.
///
/// version + pg_version + pg_control_version (3 × u32), system_identifier +
/// node_id + group + two contacts + lag (6 × u64), two role tags (2 × u32),
/// the running flag (u8), and the fixed sync_state buffer.
pub const RECORD_LEN: usize = 4 * 3 + 8 * 6 + 4 * 2 + 1 + SYNC_STATE_LEN;

#[derive(Debug, Error)]
pub enum StateStoreError {
    #[error("state io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("state record has {actual} bytes, expected {expected}")]
    UnexpectedLength { expected: usize, actual: usize },

    #[error("unsupported state file version {0}")]
    UnsupportedVersion(u32),

    #[error("state record is corrupt: {0}")]
    Corrupt(String),
}

impl From<StateStoreError> for KeeperError {
    fn from(err: StateStoreError) -> Self {
        KeeperError::StateCorrupt(err.to_string())
    }
}

/// Reader/writer for one keeper's state file.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling temp file the next record is staged in before the rename.
    pub fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".new");
        self.path.with_file_name(name)
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read and validate the current record.
    pub fn read(&self) -> Result<KeeperState, StateStoreError> {
        let bytes = std::fs::read(&self.path)?;
        decode(&bytes)
    }

    /// Durably publish a new record.
    pub fn write(&self, state: &KeeperState) -> Result<(), StateStoreError> {
        let staging = self.staging_path();
        let bytes = encode(state);

        let mut file = std::fs::File::create(&staging)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        drop(file);

        std::fs::rename(&staging, &self.path)?;

        // Make the rename durable across power loss. A filesystem that
        // refuses directory fsync still gave us the atomic rename.
        if let Some(dir) = self.path.parent() {
            match std::fs::File::open(dir) {
                Ok(d) => {
                    if let Err(e) = d.sync_all() {
                        warn!(error = %e, "state directory fsync failed");
                    }
                }
                Err(e) => warn!(error = %e, "could not open state directory for fsync"),
            }
        }
        Ok(())
    }

    /// Delete the record and any staged leftover (used by `drop node`).
    pub fn remove(&self) -> Result<(), StateStoreError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        let staging = self.staging_path();
        if staging.exists() {
            std::fs::remove_file(&staging)?;
        }
        Ok(())
    }
}

fn encode(state: &KeeperState) -> Vec<u8> {
    let mut buf = Vec::with_capacity(RECORD_LEN);
    buf.extend_from_slice(&FILE_VERSION.to_le_bytes());
    buf.extend_from_slice(&state.pg_version.to_le_bytes());
    buf.extend_from_slice(&state.pg_control_version.to_le_bytes());
    buf.extend_from_slice(&state.system_identifier.to_le_bytes());
    buf.extend_from_slice(&state.current_node_id.to_le_bytes());
    buf.extend_from_slice(&state.current_group.to_le_bytes());
    buf.extend_from_slice(&state.current_role.tag().to_le_bytes());
    buf.extend_from_slice(&state.assigned_role.tag().to_le_bytes());
    buf.extend_from_slice(&state.last_monitor_contact.to_le_bytes());
    buf.extend_from_slice(&state.last_secondary_contact.to_le_bytes());
    buf.extend_from_slice(&state.xlog_lag_bytes.to_le_bytes());
    buf.push(u8::from(state.pg_is_running));

    let mut sync = [0u8; SYNC_STATE_LEN];
    let src = state.sync_state.as_bytes();
    let len = src.len().min(SYNC_STATE_LEN);
    sync[..len].copy_from_slice(&src[..len]);
    buf.extend_from_slice(&sync);

    debug_assert_eq!(buf.len(), RECORD_LEN);
    buf
}

fn decode(bytes: &[u8]) -> Result<KeeperState, StateStoreError> {
    if bytes.len() != RECORD_LEN {
        return Err(StateStoreError::UnexpectedLength {
            expected: RECORD_LEN,
            actual: bytes.len(),
        });
    }

    let mut cursor = Cursor { bytes, pos: 0 };
    let version = cursor.u32()?;
    if version != FILE_VERSION {
        return Err(StateStoreError::UnsupportedVersion(version));
    }

    let pg_version = cursor.u32()?;
    let pg_control_version = cursor.u32()?;
    let system_identifier = cursor.u64()?;
    let current_node_id = cursor.i64()?;
    let current_group = cursor.i64()?;
    let current_role = cursor.role()?;
    let assigned_role = cursor.role()?;
    let last_monitor_contact = cursor.u64()?;
    let last_secondary_contact = cursor.u64()?;
    let xlog_lag_bytes = cursor.u64()?;
    let pg_is_running = match cursor.u8()? {
        0 => false,
        1 => true,
        other => {
            return Err(StateStoreError::Corrupt(format!(
                "pg_is_running byte is {other}"
            )))
        }
    };
    let sync_state = cursor.padded_str(SYNC_STATE_LEN)?;

    Ok(KeeperState {
        pg_version,
        pg_control_version,
        system_identifier,
        current_node_id,
        current_group,
        current_role,
        assigned_role,
        last_monitor_contact,
        last_secondary_contact,
        xlog_lag_bytes,
        pg_is_running,
        sync_state,
    })
}

/// Bounds-checked little-endian reader over the raw record.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn take(&mut self, n: usize) -> Result<&[u8], StateStoreError> {
        let end = self.pos + n;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or_else(|| StateStoreError::Corrupt("record truncated".to_string()))?;
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, StateStoreError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, StateStoreError> {
        let raw = self.take(4)?;
        let arr: [u8; 4] = raw
            .try_into()
            .map_err(|_| StateStoreError::Corrupt("short u32".to_string()))?;
        Ok(u32::from_le_bytes(arr))
    }

    fn u64(&mut self) -> Result<u64, StateStoreError> {
        let raw = self.take(8)?;
        let arr: [u8; 8] = raw
            .try_into()
            .map_err(|_| StateStoreError::Corrupt("short u64".to_string()))?;
        Ok(u64::from_le_bytes(arr))
    }

    fn i64(&mut self) -> Result<i64, StateStoreError> {
        Ok(self.u64()? as i64)
    }

    fn role(&mut self) -> Result<NodeState, StateStoreError> {
        let tag = self.u32()?;
        NodeState::from_tag(tag)
            .ok_or_else(|| StateStoreError::Corrupt(format!("unknown role tag {tag}")))
    }

    fn padded_str(&mut self, n: usize) -> Result<String, StateStoreError> {
        let raw = self.take(n)?;
        let end = raw.iter().position(|b| *b == 0).unwrap_or(n);
        std::str::from_utf8(&raw[..end])
            .map(str::to_string)
            .map_err(|_| StateStoreError::Corrupt("sync_state is not utf-8".to_string()))
    }
}

#[cfg(test)]
#[path = "state_store_tests.rs"]
mod tests;
