// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transaction log errors

use kv_core::EventError;
use thiserror::Error;

/// Errors from log backends and the transaction logger
#[derive(Debug, Error)]
pub enum LogError {
    #[error("log I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "pg")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// `position` is the line number for file logs and the row sequence for tables
    #[error("corrupted record at position {position}: {reason}")]
    Corrupted { position: u64, reason: String },

    #[error("transaction number out of sequence: {found} follows {previous}")]
    OutOfSequence { previous: u64, found: u64 },

    #[error("log backend setup failed: {0}")]
    Setup(String),

    #[error("event cannot be recorded: {0}")]
    Unencodable(#[from] EventError),

    #[error("transaction logger is not running")]
    NotRunning,

    #[error("transaction logger is already running")]
    AlreadyRunning,

    #[error("log must be replayed before the logger can run")]
    ReplayRequired,

    #[error("transaction logger is closed")]
    Closed,

    #[error("append worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl LogError {
    /// True if the error means the stored history cannot be trusted
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            LogError::Corrupted { .. } | LogError::OutOfSequence { .. }
        )
    }

    pub(crate) fn corrupted(position: u64, reason: impl Into<String>) -> Self {
        LogError::Corrupted {
            position,
            reason: reason.into(),
        }
    }
}
