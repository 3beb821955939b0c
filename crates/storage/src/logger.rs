// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Asynchronous transaction logger
//!
//! Callers submit mutations into a bounded queue; one worker task drains it
//! in FIFO order, stamps each event with the next sequence number and appends
//! it to the backend. Append failures go to an error channel and never stop
//! the worker.
//!
//! Lifecycle: the log is replayed with [`TransactionLogger::read_events`],
//! the worker is started with [`TransactionLogger::run`], and
//! [`TransactionLogger::close`] drains everything still queued before
//! releasing the backend.

use crate::backend::LogBackend;
use crate::error::LogError;
use futures_util::stream::{self, BoxStream, StreamExt};
use kv_core::Event;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

/// Default depth of the submission queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// Tuning for a transaction logger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggerOptions {
    /// Submissions beyond this many queued events wait for the worker
    pub queue_capacity: usize,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

enum Phase {
    /// Backend owned by the logger, worker not started
    Idle(Box<dyn LogBackend>),
    /// Worker owns the backend and hands it back when the queue closes
    Running {
        events: mpsc::Sender<Event>,
        worker: JoinHandle<Box<dyn LogBackend>>,
    },
    Closed,
}

impl Phase {
    fn misuse(&self) -> LogError {
        match self {
            Phase::Idle(_) => LogError::NotRunning,
            Phase::Running { .. } => LogError::AlreadyRunning,
            Phase::Closed => LogError::Closed,
        }
    }
}

/// Counters shared between the logger handle and its worker
#[derive(Default)]
struct Progress {
    /// Highest sequence durably appended, as reported by the backend
    last_sequence: AtomicU64,
    /// Events accepted but not yet attempted
    pending: AtomicUsize,
    drained: Notify,
}

impl Progress {
    fn finish_one(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.drained.notify_waiters();
        }
    }
}

/// Write-ahead log front end
pub struct TransactionLogger {
    phase: Mutex<Phase>,
    options: LoggerOptions,
    progress: Arc<Progress>,
    replayed: bool,
    /// Moved into the worker so the channel closes when it exits
    errors_tx: Mutex<Option<mpsc::UnboundedSender<LogError>>>,
    errors_rx: Mutex<Option<mpsc::UnboundedReceiver<LogError>>>,
}

impl TransactionLogger {
    pub fn new(backend: impl LogBackend) -> Self {
        Self::with_options(backend, LoggerOptions::default())
    }

    pub fn with_options(backend: impl LogBackend, options: LoggerOptions) -> Self {
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();
        Self {
            phase: Mutex::new(Phase::Idle(Box::new(backend))),
            options: LoggerOptions {
                queue_capacity: options.queue_capacity.max(1),
            },
            progress: Arc::new(Progress::default()),
            replayed: false,
            errors_tx: Mutex::new(Some(errors_tx)),
            errors_rx: Mutex::new(Some(errors_rx)),
        }
    }

    /// Stream the stored history, checking that sequences strictly increase.
    ///
    /// The first failure is yielded and ends the stream. Draining the stream
    /// to the end marks the log as replayed, which [`run`](Self::run)
    /// requires.
    pub fn read_events(&mut self) -> BoxStream<'_, Result<Event, LogError>> {
        let Self {
            phase,
            progress,
            replayed,
            ..
        } = self;
        *replayed = false;

        let backend = match phase.get_mut().unwrap_or_else(|e| e.into_inner()) {
            Phase::Idle(backend) => backend,
            Phase::Running { .. } => {
                return stream::iter([Err(LogError::AlreadyRunning)]).boxed();
            }
            Phase::Closed => return stream::iter([Err(LogError::Closed)]).boxed(),
        };

        let cursor = ReplayCursor {
            inner: backend.replay(),
            previous: 0,
            finished: false,
            replayed,
            last_sequence: &progress.last_sequence,
        };
        stream::unfold(cursor, ReplayCursor::next).boxed()
    }

    /// Start the append worker
    pub fn run(&self) -> Result<(), LogError> {
        let mut phase = self.lock_phase();
        if !matches!(*phase, Phase::Idle(_)) {
            return Err(phase.misuse());
        }
        if !self.replayed {
            return Err(LogError::ReplayRequired);
        }
        let Some(errors) = self.take_errors_tx() else {
            return Err(LogError::AlreadyRunning);
        };
        let Phase::Idle(backend) = std::mem::replace(&mut *phase, Phase::Closed) else {
            return Err(LogError::Closed);
        };

        tracing::info!(
            backend = backend.kind(),
            last_sequence = self.last_sequence(),
            queue_capacity = self.options.queue_capacity,
            "transaction logger running"
        );

        let (events, queue) = mpsc::channel(self.options.queue_capacity);
        let worker = tokio::spawn(append_worker(
            backend,
            queue,
            Arc::clone(&self.progress),
            errors,
        ));
        *phase = Phase::Running { events, worker };
        Ok(())
    }

    /// Queue a put; returns once the event is enqueued
    pub async fn write_put(&self, key: &str, value: &str) -> Result<(), LogError> {
        self.submit(Event::put(key, value)).await
    }

    /// Queue a delete; returns once the event is enqueued
    pub async fn write_delete(&self, key: &str) -> Result<(), LogError> {
        self.submit(Event::delete(key)).await
    }

    async fn submit(&self, event: Event) -> Result<(), LogError> {
        event.validate()?;
        let events = self.reserve_slot()?;

        if events.send(event).await.is_err() {
            self.progress.finish_one();
            return Err(LogError::Closed);
        }
        Ok(())
    }

    /// Count the submission as pending and hand back a queue handle
    fn reserve_slot(&self) -> Result<mpsc::Sender<Event>, LogError> {
        let phase = self.lock_phase();
        match &*phase {
            Phase::Running { events, .. } => {
                self.progress.pending.fetch_add(1, Ordering::AcqRel);
                Ok(events.clone())
            }
            other => Err(other.misuse()),
        }
    }

    /// Receiver for append failures; available once
    pub fn errors(&self) -> Option<mpsc::UnboundedReceiver<LogError>> {
        self.errors_rx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }

    /// Resolve once every accepted event has been attempted
    pub async fn wait(&self) {
        loop {
            let drained = self.progress.drained.notified();
            tokio::pin!(drained);
            drained.as_mut().enable();

            if self.progress.pending.load(Ordering::Acquire) == 0 {
                return;
            }
            drained.await;
        }
    }

    /// Drain the queue, stop the worker and close the backend
    pub async fn close(&self) -> Result<(), LogError> {
        self.wait().await;
        drop(self.take_errors_tx());

        let mut backend = match self.take_phase() {
            Phase::Closed => return Err(LogError::Closed),
            Phase::Idle(backend) => backend,
            Phase::Running { events, worker } => {
                drop(events);
                worker.await?
            }
        };

        tracing::info!(
            backend = backend.kind(),
            last_sequence = self.last_sequence(),
            "closing transaction log"
        );
        backend.close().await
    }

    /// Highest sequence durably appended (or found by replay)
    pub fn last_sequence(&self) -> u64 {
        self.progress.last_sequence.load(Ordering::Acquire)
    }

    /// Events accepted but not yet attempted
    pub fn pending(&self) -> usize {
        self.progress.pending.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.lock_phase(), Phase::Running { .. })
    }

    fn take_errors_tx(&self) -> Option<mpsc::UnboundedSender<LogError>> {
        self.errors_tx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }

    fn take_phase(&self) -> Phase {
        std::mem::replace(&mut *self.lock_phase(), Phase::Closed)
    }

    fn lock_phase(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// State threaded through the validated replay stream
struct ReplayCursor<'a> {
    inner: BoxStream<'a, Result<Event, LogError>>,
    previous: u64,
    finished: bool,
    replayed: &'a mut bool,
    last_sequence: &'a AtomicU64,
}

impl<'a> ReplayCursor<'a> {
    async fn next(mut self) -> Option<(Result<Event, LogError>, Self)> {
        if self.finished {
            return None;
        }

        let item = match self.inner.next().await {
            None => {
                *self.replayed = true;
                self.last_sequence.store(self.previous, Ordering::Release);
                return None;
            }
            Some(Ok(event)) if event.sequence <= self.previous => {
                Err(LogError::OutOfSequence {
                    previous: self.previous,
                    found: event.sequence,
                })
            }
            Some(Ok(event)) => {
                self.previous = event.sequence;
                return Some((Ok(event), self));
            }
            Some(Err(e)) => Err(e),
        };

        self.finished = true;
        Some((item, self))
    }
}

async fn append_worker(
    mut backend: Box<dyn LogBackend>,
    mut queue: mpsc::Receiver<Event>,
    progress: Arc<Progress>,
    errors: mpsc::UnboundedSender<LogError>,
) -> Box<dyn LogBackend> {
    while let Some(event) = queue.recv().await {
        let sequence = progress.last_sequence.load(Ordering::Acquire) + 1;
        let event = event.with_sequence(sequence);

        match backend.append(&event).await {
            Ok(stored) => {
                if stored != sequence {
                    tracing::debug!(proposed = sequence, stored, "backend assigned sequence");
                }
                progress.last_sequence.store(stored, Ordering::Release);
            }
            Err(e) => {
                tracing::error!(
                    sequence,
                    event_type = %event.event_type,
                    key = %event.key,
                    error = %e,
                    "failed to append event"
                );
                // Nobody listening is fine; the failure is already logged
                let _ = errors.send(e);
            }
        }

        progress.finish_one();
    }

    tracing::debug!("append queue closed");
    backend
}

#[cfg(test)]
#[path = "logger_tests.rs"]
mod tests;
