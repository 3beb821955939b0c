// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable storage behind the transaction logger

use crate::error::LogError;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use kv_core::Event;

/// Append-only storage of events that can be streamed back in order.
///
/// The logger owns its backend exclusively and drives it from a single
/// worker, so implementations never see concurrent calls.
#[async_trait]
pub trait LogBackend: Send + 'static {
    /// Short name used in logs ("file", "postgres", ...)
    fn kind(&self) -> &'static str;

    /// Durably store one sequenced event.
    ///
    /// Returns the sequence the event was stored under. Backends that assign
    /// their own numbers may return something other than `event.sequence`.
    async fn append(&mut self, event: &Event) -> Result<u64, LogError>;

    /// Stream the full history from the beginning in storage order.
    ///
    /// Stored sequence numbers are returned as read; strict ordering is
    /// checked by the logger so every backend shares one validation rule.
    fn replay(&mut self) -> BoxStream<'_, Result<Event, LogError>>;

    /// Flush and release the underlying handle
    async fn close(&mut self) -> Result<(), LogError>;
}

#[async_trait]
impl LogBackend for Box<dyn LogBackend> {
    fn kind(&self) -> &'static str {
        (**self).kind()
    }

    async fn append(&mut self, event: &Event) -> Result<u64, LogError> {
        (**self).append(event).await
    }

    fn replay(&mut self) -> BoxStream<'_, Result<Event, LogError>> {
        (**self).replay()
    }

    async fn close(&mut self) -> Result<(), LogError> {
        (**self).close().await
    }
}
