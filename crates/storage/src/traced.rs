// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced backend wrapper for consistent observability

use crate::backend::LogBackend;
use crate::error::LogError;
use async_trait::async_trait;
use futures_util::stream::{BoxStream, StreamExt};
use kv_core::Event;
use tracing::Instrument;

/// Wrapper that adds tracing to any LogBackend
pub struct TracedBackend<B> {
    inner: B,
}

impl<B> TracedBackend<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> B {
        self.inner
    }
}

#[async_trait]
impl<B: LogBackend> LogBackend for TracedBackend<B> {
    fn kind(&self) -> &'static str {
        self.inner.kind()
    }

    async fn append(&mut self, event: &Event) -> Result<u64, LogError> {
        let span = tracing::debug_span!(
            "log.append",
            backend = self.inner.kind(),
            sequence = event.sequence,
            event_type = %event.event_type,
            stored = tracing::field::Empty,
        );
        let recorder = span.clone();
        let inner = &mut self.inner;

        async move {
            let start = std::time::Instant::now();
            let result = inner.append(event).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(stored) => {
                    recorder.record("stored", *stored);
                    tracing::trace!(elapsed_us = elapsed.as_micros() as u64, "appended");
                }
                Err(e) => tracing::error!(
                    elapsed_us = elapsed.as_micros() as u64,
                    error = %e,
                    "append failed"
                ),
            }

            result
        }
        .instrument(span)
        .await
    }

    fn replay(&mut self) -> BoxStream<'_, Result<Event, LogError>> {
        let kind = self.inner.kind();
        tracing::info!(backend = kind, "replay started");

        let mut count = 0u64;
        self.inner
            .replay()
            .inspect(move |item| match item {
                Ok(_) => count += 1,
                Err(e) => tracing::error!(backend = kind, after = count, error = %e, "replay failed"),
            })
            .boxed()
    }

    async fn close(&mut self) -> Result<(), LogError> {
        let span = tracing::info_span!("log.close", backend = self.inner.kind());
        let result = self.inner.close().instrument(span.clone()).await;

        let _guard = span.enter();
        match &result {
            Ok(()) => tracing::info!("closed"),
            Err(e) => tracing::warn!(error = %e, "close failed"),
        }

        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
