// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kv-daemon: the `kvd` key-value service
//!
//! Configuration, startup recovery, the HTTP interface and graceful shutdown.

pub mod config;
pub mod lifecycle;
pub mod server;

pub use config::{AppendErrorPolicy, BackendConfig, Config, ConfigError};
pub use lifecycle::{
    startup, startup_with_backend, Daemon, DaemonState, LifecycleError, ShutdownHandle,
    ShutdownReport,
};
pub use server::{router, AppState, ServerError};
