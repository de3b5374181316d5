// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pgk-storage: durable on-disk keeper state.

pub mod init_marker;
pub mod state_store;

pub use state_store::{StateStore, StateStoreError, FILE_VERSION, RECORD_LEN};
