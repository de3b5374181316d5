// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pgk_core::node_state::ALL_STATES;
use proptest::prelude::*;
use tempfile::TempDir;

fn store_in(dir: &TempDir) -> StateStore {
    StateStore::new(dir.path().join("pg_autoctl.state"))
}

fn sample_state() -> KeeperState {
    KeeperState {
        pg_version: 1600,
        pg_control_version: 1300,
        system_identifier: 7_214_528_887_091_011_111,
        current_node_id: 2,
        current_group: 0,
        current_role: NodeState::Primary,
        assigned_role: NodeState::Primary,
        last_monitor_contact: 1_700_000_000,
        last_secondary_contact: 1_700_000_005,
        xlog_lag_bytes: 16_384,
        pg_is_running: true,
        sync_state: "sync".to_string(),
    }
}

fn arb_state() -> impl Strategy<Value = KeeperState> {
    (
        (any::<u32>(), any::<u32>(), any::<u64>()),
        (any::<i64>(), any::<i64>()),
        (0usize..ALL_STATES.len(), 0usize..ALL_STATES.len()),
        (any::<u64>(), any::<u64>(), any::<u64>(), any::<bool>()),
        "[a-z_]{0,32}",
    )
        .prop_map(|(versions, ids, roles, stats, sync_state)| KeeperState {
            pg_version: versions.0,
            pg_control_version: versions.1,
            system_identifier: versions.2,
            current_node_id: ids.0,
            current_group: ids.1,
            current_role: ALL_STATES[roles.0],
            assigned_role: ALL_STATES[roles.1],
            last_monitor_contact: stats.0,
            last_secondary_contact: stats.1,
            xlog_lag_bytes: stats.2,
            pg_is_running: stats.3,
            sync_state,
        })
}

#[test]
fn write_then_read_returns_the_record() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let state = sample_state();

    store.write(&state).unwrap();
    assert_eq!(store.read().unwrap(), state);
}

#[test]
fn read_of_missing_file_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    assert!(matches!(store.read(), Err(StateStoreError::Io(_))));
}

#[test]
fn staging_path_is_a_sibling_dot_new_file() {
    let store = StateStore::new("/var/lib/pg/pg_autoctl.state");
    assert_eq!(
        store.staging_path(),
        std::path::PathBuf::from("/var/lib/pg/pg_autoctl.state.new")
    );
}

#[test]
fn unknown_file_version_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    store.write(&sample_state()).unwrap();

    let mut bytes = std::fs::read(store.path()).unwrap();
    bytes[0..4].copy_from_slice(&99u32.to_le_bytes());
    std::fs::write(store.path(), &bytes).unwrap();

    assert!(matches!(
        store.read(),
        Err(StateStoreError::UnsupportedVersion(99))
    ));
}

#[test]
fn unknown_role_tag_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    store.write(&sample_state()).unwrap();

    let mut bytes = std::fs::read(store.path()).unwrap();
    // current_role tag sits after 3 × u32 + 3 × u64.
    let offset = 4 * 3 + 8 * 3;
    bytes[offset..offset + 4].copy_from_slice(&77u32.to_le_bytes());
    std::fs::write(store.path(), &bytes).unwrap();

    assert!(matches!(store.read(), Err(StateStoreError::Corrupt(_))));
}

#[test]
fn bad_running_flag_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    store.write(&sample_state()).unwrap();

    let mut bytes = std::fs::read(store.path()).unwrap();
    let offset = RECORD_LEN - pgk_core::SYNC_STATE_LEN - 1;
    bytes[offset] = 7;
    std::fs::write(store.path(), &bytes).unwrap();

    assert!(matches!(store.read(), Err(StateStoreError::Corrupt(_))));
}

#[test]
fn over_long_sync_state_is_truncated_not_fatal() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let mut state = sample_state();
    state.sync_state = "x".repeat(100);

    store.write(&state).unwrap();
    let read = store.read().unwrap();
    assert_eq!(read.sync_state.len(), pgk_core::SYNC_STATE_LEN);
}

#[test]
fn remove_deletes_record_and_staging_leftover() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    store.write(&sample_state()).unwrap();
    std::fs::write(store.staging_path(), b"leftover").unwrap();

    store.remove().unwrap();
    assert!(!store.path().exists());
    assert!(!store.staging_path().exists());
}

proptest! {
    // Round-trip over randomized records: whatever was written is read back.
    #[test]
    fn any_record_round_trips(state in arb_state()) {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let mut expected = state.clone();
        expected.sync_state.truncate(pgk_core::SYNC_STATE_LEN);

        store.write(&state).unwrap();
        prop_assert_eq!(store.read().unwrap(), expected);
    }

    // A crash that leaves the staged temp file truncated at any byte
    // offset never affects what readers observe.
    #[test]
    fn torn_staging_write_preserves_previous_record(
        old in arb_state(),
        new in arb_state(),
        cut in 0usize..RECORD_LEN,
    ) {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let mut expected = old.clone();
        expected.sync_state.truncate(pgk_core::SYNC_STATE_LEN);

        store.write(&old).unwrap();

        // Simulate a crash mid-write: the new record only made it to the
        // staging file, and only partially.
        let staged = {
            let full_dir = TempDir::new().unwrap();
            let scratch = StateStore::new(full_dir.path().join("s"));
            scratch.write(&new).unwrap();
            std::fs::read(scratch.path()).unwrap()
        };
        std::fs::write(store.staging_path(), &staged[..cut]).unwrap();

        prop_assert_eq!(store.read().unwrap(), expected);
    }

    // A record torn in place (truncated live file after a corrupting crash)
    // is rejected outright, never decoded into a mixed state.
    #[test]
    fn truncated_live_record_is_rejected(state in arb_state(), cut in 0usize..RECORD_LEN) {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.write(&state).unwrap();

        let bytes = std::fs::read(store.path()).unwrap();
        std::fs::write(store.path(), &bytes[..cut]).unwrap();

        let is_unexpected_length = matches!(
            store.read(),
            Err(StateStoreError::UnexpectedLength { .. })
        );
        prop_assert!(is_unexpected_length);
    }
}
