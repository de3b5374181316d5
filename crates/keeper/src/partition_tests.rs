// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pgk_core::NodeState;
use yare::parameterized;

const TAU: u64 = 10;

fn primary_state(monitor_contact: u64, secondary_contact: u64) -> KeeperState {
    KeeperState {
        current_role: NodeState::Primary,
        assigned_role: NodeState::Primary,
        last_monitor_contact: monitor_contact,
        last_secondary_contact: secondary_contact,
        ..KeeperState::default()
    }
}

#[test]
fn connected_replica_means_healthy_and_refreshes_contact() {
    let mut state = primary_state(100, 100);
    let verdict = evaluate(&mut state, 500, TAU, true);

    assert_eq!(verdict, NetworkHealth::Healthy);
    assert_eq!(state.last_secondary_contact, 500);
    // The monitor contact is not touched; only its round-trips move it.
    assert_eq!(state.last_monitor_contact, 100);
}

#[test]
fn bilateral_silence_past_tau_is_a_partition() {
    let mut state = primary_state(100, 100);
    let verdict = evaluate(&mut state, 111, TAU, false);
    assert_eq!(verdict, NetworkHealth::Partitioned);
}

#[parameterized(
    at_the_boundary = { 110, 110 },
    monitor_recent = { 105, 100 },
    secondary_recent = { 100, 105 },
)]
fn within_grace_while_either_lag_is_at_or_under_tau(monitor_contact: u64, secondary_contact: u64) {
    let mut state = primary_state(monitor_contact, secondary_contact);
    // now = 110 → lag of a contact at 100 is exactly τ, not past it.
    let verdict = evaluate(&mut state, 110, TAU, false);
    assert_eq!(verdict, NetworkHealth::WithinGrace);
}

#[parameterized(
    never_saw_monitor = { 0, 100 },
    never_saw_secondary = { 100, 0 },
    never_saw_either = { 0, 0 },
)]
fn zero_contacts_never_trigger_demotion(monitor_contact: u64, secondary_contact: u64) {
    let mut state = primary_state(monitor_contact, secondary_contact);
    let verdict = evaluate(&mut state, 1_000_000, TAU, false);
    assert_eq!(verdict, NetworkHealth::WithinGrace);
}

#[test]
fn clock_skew_does_not_underflow() {
    // Contacts recorded "in the future" of the current tick.
    let mut state = primary_state(1_000, 1_000);
    let verdict = evaluate(&mut state, 500, TAU, false);
    assert_eq!(verdict, NetworkHealth::WithinGrace);
}

#[test]
fn verdict_does_not_mutate_roles() {
    let mut state = primary_state(100, 100);
    let _ = evaluate(&mut state, 111, TAU, false);
    // Setting assigned_role = DemoteTimeout is the caller's move.
    assert_eq!(state.assigned_role, NodeState::Primary);
    assert_eq!(state.current_role, NodeState::Primary);
}
