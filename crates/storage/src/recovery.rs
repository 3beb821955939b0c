// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup recovery: rebuild the store from the log, then start logging

use crate::backend::LogBackend;
use crate::error::LogError;
use crate::logger::{LoggerOptions, TransactionLogger};
use futures_util::TryStreamExt;
use kv_core::{EventType, Store, StoreError};
use thiserror::Error;

/// Errors that abort startup recovery
#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("failed to replay transaction log: {0}")]
    Replay(#[source] LogError),

    #[error("failed to apply event {sequence}: {source}")]
    Apply {
        sequence: u64,
        #[source]
        source: StoreError,
    },

    #[error("failed to start transaction logger: {0}")]
    Start(#[source] LogError),
}

/// What a replay restored
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub events: u64,
    pub puts: u64,
    pub deletes: u64,
    pub last_sequence: u64,
    /// Keys present after replay
    pub keys: usize,
}

/// Apply the full log history to `store`.
///
/// Events are applied to a staging store first; `store` is only replaced
/// once the whole log has been read and validated, so a corrupted log leaves
/// it untouched.
pub async fn replay_into(
    store: &Store,
    logger: &mut TransactionLogger,
) -> Result<ReplaySummary, RecoveryError> {
    let staged = Store::new();
    let mut summary = ReplaySummary::default();

    let mut events = logger.read_events();
    while let Some(event) = events.try_next().await.map_err(RecoveryError::Replay)? {
        staged
            .apply(&event)
            .map_err(|source| RecoveryError::Apply {
                sequence: event.sequence,
                source,
            })?;

        summary.events += 1;
        summary.last_sequence = event.sequence;
        match event.event_type {
            EventType::Put => summary.puts += 1,
            EventType::Delete => summary.deletes += 1,
        }
    }
    drop(events);

    summary.keys = staged.len();
    store.replace_with(staged);
    Ok(summary)
}

/// Replay the log into `store` and start the logger.
///
/// Any failure here is fatal: the service must not accept traffic against a
/// partially restored store.
pub async fn initialize_durability(
    store: &Store,
    backend: impl LogBackend,
    options: LoggerOptions,
) -> Result<(TransactionLogger, ReplaySummary), RecoveryError> {
    let kind = backend.kind();
    let mut logger = TransactionLogger::with_options(backend, options);

    let summary = replay_into(store, &mut logger).await?;
    tracing::info!(
        backend = kind,
        events = summary.events,
        puts = summary.puts,
        deletes = summary.deletes,
        keys = summary.keys,
        last_sequence = summary.last_sequence,
        "transaction log replayed"
    );

    logger.run().map_err(RecoveryError::Start)?;
    Ok((logger, summary))
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
