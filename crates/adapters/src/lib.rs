// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pgk-adapters: thin seams around PostgreSQL and the monitor.
//!
//! No policy lives here. The keeper decides what to do; these adapters only
//! know how to do it (or, for the fakes, how to pretend convincingly).

pub mod monitor;
pub mod pg;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeMonitorClient, FakePgController};
pub use monitor::{MonitorClient, MonitorError, PsqlMonitorClient};
pub use pg::{ControlData, PgController, PgCtlController, PgError, UpstreamNode};
