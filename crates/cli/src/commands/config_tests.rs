// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

fn write_sample(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("pg_autoctl.cfg");
    let config = KeeperConfig::seed(
        dir.path().to_path_buf(),
        "default".to_string(),
        "node-a".to_string(),
        "postgres://monitor/pg_auto_failover".to_string(),
    );
    config.save(&path).unwrap();
    path
}

#[test]
fn get_reads_dotted_keys() {
    let dir = TempDir::new().unwrap();
    let path = write_sample(&dir);

    assert_eq!(read_key(&path, "pg_autoctl.formation").unwrap(), "default");
    assert_eq!(
        read_key(&path, "timeout.network_partition_timeout").unwrap(),
        "20"
    );
}

#[test]
fn get_of_unknown_key_is_bad_args() {
    let dir = TempDir::new().unwrap();
    let path = write_sample(&dir);

    let err = read_key(&path, "timeout.nope").unwrap_err();
    assert_eq!(err.code, pgk_core::exit_codes::BAD_ARGS);

    let err = read_key(&path, "flat").unwrap_err();
    assert_eq!(err.code, pgk_core::exit_codes::BAD_ARGS);
}

#[test]
fn set_preserves_the_setting_type() {
    let dir = TempDir::new().unwrap();
    let path = write_sample(&dir);

    write_key(&path, "timeout.network_partition_timeout", "30").unwrap();
    assert_eq!(
        read_key(&path, "timeout.network_partition_timeout").unwrap(),
        "30"
    );

    // The file still parses as a full keeper configuration.
    let config = KeeperConfig::load(&path).unwrap();
    assert_eq!(config.timeout.network_partition_timeout, 30);
}

#[test]
fn set_rejects_values_that_break_the_config() {
    let dir = TempDir::new().unwrap();
    let path = write_sample(&dir);

    let err = write_key(&path, "timeout.network_partition_timeout", "never").unwrap_err();
    assert_eq!(err.code, pgk_core::exit_codes::BAD_ARGS);

    // And the file is untouched.
    let config = KeeperConfig::load(&path).unwrap();
    assert_eq!(config.timeout.network_partition_timeout, 20);
}
