// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

#[test]
fn control_data_parsing_picks_identity_fields() {
    let text = "\
pg_control version number:            1300
Catalog version number:               202307071
Database system identifier:           7214528887091011111
Database cluster state:               in production
";
    let control = parse_control_data(text);
    assert_eq!(control.pg_control_version, 1300);
    assert_eq!(control.system_identifier, 7_214_528_887_091_011_111);
    // pg_version comes from PG_VERSION, not from pg_controldata.
    assert_eq!(control.pg_version, 0);
}

#[test]
fn control_data_parsing_tolerates_garbage() {
    let control = parse_control_data("not controldata output at all\n");
    assert_eq!(control, ControlData::default());
}

#[test]
fn hba_append_skips_duplicate_rules() {
    let dir = TempDir::new().unwrap();
    let hba = dir.path().join("pg_hba.conf");
    std::fs::write(&hba, "local all all trust\n").unwrap();

    let line = "host replication pgautofailover_replicator 10.0.0.2/32 md5\n";
    append_hba_line(&hba, line).unwrap();
    append_hba_line(&hba, line).unwrap();

    let contents = std::fs::read_to_string(&hba).unwrap();
    assert_eq!(contents.matches("10.0.0.2/32").count(), 1);
    // The pre-existing rule is untouched.
    assert!(contents.starts_with("local all all trust\n"));
}

#[test]
fn hba_append_creates_missing_file() {
    let dir = TempDir::new().unwrap();
    let hba = dir.path().join("pg_hba.conf");

    append_hba_line(&hba, "host all autoctl_node 10.0.0.9/32 trust\n").unwrap();
    assert!(std::fs::read_to_string(&hba)
        .unwrap()
        .contains("autoctl_node"));
}
