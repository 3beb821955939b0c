// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kv-storage: write-ahead log for the key-value service
//!
//! - `LogBackend` implementations (flat file, PostgreSQL table)
//! - `TransactionLogger`, the asynchronous single-writer append pipeline
//! - Startup recovery that rebuilds a `Store` from the log

pub mod backend;
pub mod error;
pub mod file;
pub mod logger;
#[cfg(feature = "pg")]
pub mod postgres;
mod record;
pub mod recovery;
pub mod traced;

#[cfg(any(test, feature = "test-support"))]
pub mod memory;

pub use backend::LogBackend;
pub use error::LogError;
pub use file::{FileBackend, FileOptions};
pub use logger::{LoggerOptions, TransactionLogger, DEFAULT_QUEUE_CAPACITY};
#[cfg(feature = "pg")]
pub use postgres::{PgParams, PostgresBackend};
pub use recovery::{initialize_durability, replay_into, RecoveryError, ReplaySummary};
pub use traced::TracedBackend;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryBackend;
