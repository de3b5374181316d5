// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn reload_flag_is_consumed_on_take() {
    let intake = SignalIntake::new();
    assert!(!intake.take_reload());

    intake.request_reload();
    assert!(intake.take_reload());
    assert!(!intake.take_reload());
}

#[test]
fn fast_stop_implies_stop() {
    let intake = SignalIntake::new();
    intake.request_stop_fast();
    assert!(intake.asked_to_stop());
    assert!(intake.asked_to_stop_fast());
}

#[test]
fn graceful_stop_is_not_a_fast_stop() {
    let intake = SignalIntake::new();
    intake.request_stop();
    assert!(intake.asked_to_stop());
    assert!(!intake.asked_to_stop_fast());
}

#[tokio::test]
async fn sleep_wakes_early_on_signal() {
    let intake = SignalIntake::new();
    let sleeper = intake.clone();
    let handle = tokio::spawn(async move {
        sleeper.sleep(Duration::from_secs(3600)).await;
    });

    tokio::task::yield_now().await;
    intake.request_stop();
    // The hour-long sleep only returns within the timeout if the signal
    // woke it.
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
}
