// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory log backend for tests

use crate::backend::LogBackend;
use crate::error::LogError;
use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use kv_core::Event;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct MemoryState {
    events: Vec<Event>,
    /// Replay yields this error after the stored events when set
    replay_error: Option<String>,
    fail_appends: bool,
    /// Next number handed out when the backend assigns its own sequences
    serial: Option<u64>,
    closed: bool,
    close_calls: usize,
}

/// Log backend that keeps events in a shared vector.
///
/// Clones share state, so a test can keep one handle and hand the other to
/// a logger, then inspect what was written.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend preloaded with a history, stored exactly as given
    pub fn with_events(events: impl IntoIterator<Item = Event>) -> Self {
        let backend = Self::new();
        backend.lock().events.extend(events);
        backend
    }

    /// Everything appended so far
    pub fn events(&self) -> Vec<Event> {
        self.lock().events.clone()
    }

    /// Make every subsequent append fail until reset
    pub fn fail_appends(&self, fail: bool) {
        self.lock().fail_appends = fail;
    }

    /// Assign sequences from a counter that every append attempt advances,
    /// failed ones included, the way a database serial column does
    pub fn assign_sequences(&self) {
        let mut state = self.lock();
        let next = state.events.last().map_or(1, |e| e.sequence + 1);
        state.serial = Some(next);
    }

    /// Make replay report corruption after the stored events
    pub fn corrupt_tail(&self, reason: &str) {
        self.lock().replay_error = Some(reason.to_string());
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn close_calls(&self) -> usize {
        self.lock().close_calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl LogBackend for MemoryBackend {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn append(&mut self, event: &Event) -> Result<u64, LogError> {
        event.validate()?;

        let mut state = self.lock();
        if state.closed {
            return Err(LogError::Closed);
        }
        let sequence = match state.serial.as_mut() {
            Some(serial) => {
                *serial += 1;
                *serial - 1
            }
            None => event.sequence,
        };
        if state.fail_appends {
            return Err(LogError::Io(std::io::Error::other("injected append failure")));
        }
        state.events.push(event.clone().with_sequence(sequence));
        Ok(sequence)
    }

    fn replay(&mut self) -> BoxStream<'_, Result<Event, LogError>> {
        let state = self.lock();
        let mut items: Vec<Result<Event, LogError>> =
            state.events.iter().cloned().map(Ok).collect();
        if let Some(reason) = &state.replay_error {
            items.push(Err(LogError::corrupted(
                state.events.len() as u64 + 1,
                reason.clone(),
            )));
        }
        stream::iter(items).boxed()
    }

    async fn close(&mut self) -> Result<(), LogError> {
        let mut state = self.lock();
        state.closed = true;
        state.close_calls += 1;
        Ok(())
    }
}
