// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Version strings exposed by the CLI and the status server.

/// Version of the pgk binaries.
pub const CLI_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Monitor-side extension version this keeper speaks.
pub const EXTENSION_VERSION: &str = "1.4";

/// HTTP status API version (the `/1.0/...` prefix).
pub const API_VERSION: &str = "1.0";
