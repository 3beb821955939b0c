// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, recovery.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use kv_core::Store;
use kv_storage::{
    initialize_durability, FileBackend, FileOptions, LogBackend, LogError, LoggerOptions,
    PostgresBackend, RecoveryError, ReplaySummary, TracedBackend, TransactionLogger,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::{AppendErrorPolicy, BackendConfig, Config};
use crate::server::{self, AppState};

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Failed to open transaction log: {0}")]
    Backend(#[source] LogError),

    #[error("Recovery failed: {0}")]
    Recovery(#[from] RecoveryError),

    #[error("Failed to bind {0}: {1}")]
    BindFailed(SocketAddr, #[source] std::io::Error),

    #[error("Failed to close transaction log: {0}")]
    Close(#[source] LogError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Cloneable trigger for graceful shutdown
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn request(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_requested(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once shutdown has been requested
    pub async fn requested(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in self, so the channel cannot close here
        let _ = rx.wait_for(|requested| *requested).await;
    }
}

/// What happened over the daemon's lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    pub last_sequence: u64,
    pub append_failures: u64,
    /// Shutdown was triggered by an append failure
    pub stopped_on_error: bool,
}

/// Daemon state during operation
pub struct DaemonState {
    pub config: Config,
    pub store: Arc<Store>,
    pub logger: Arc<TransactionLogger>,
    /// What startup recovery restored
    pub replay: ReplaySummary,
    pub start_time: Instant,
    app: AppState,
    shutdown: ShutdownHandle,
    monitor: JoinHandle<MonitorOutcome>,
}

/// A started daemon: recovered state plus the bound listener
pub struct Daemon {
    pub state: DaemonState,
    pub listener: TcpListener,
}

#[derive(Debug, Default)]
struct MonitorOutcome {
    failures: u64,
    stopped_on_error: bool,
}

impl DaemonState {
    /// Handler state; every clone shares one write ordering
    pub fn app_state(&self) -> AppState {
        self.app.clone()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Shutdown the daemon gracefully
    ///
    /// Drains every queued event to the log before closing it.
    pub async fn shutdown(self) -> Result<ShutdownReport, LifecycleError> {
        info!("Shutting down daemon...");
        self.shutdown.request();

        // 1. Drain the queue and close the backend; this also closes the
        //    error channel, which ends the monitor
        let closed = self.logger.close().await;

        // 2. Collect what the monitor saw
        let outcome = match self.monitor.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("append error monitor failed: {}", e);
                MonitorOutcome::default()
            }
        };

        let report = ShutdownReport {
            last_sequence: self.logger.last_sequence(),
            append_failures: outcome.failures,
            stopped_on_error: outcome.stopped_on_error,
        };

        match closed {
            Ok(()) | Err(LogError::Closed) => {}
            Err(e) => return Err(LifecycleError::Close(e)),
        }

        info!(
            last_sequence = report.last_sequence,
            append_failures = report.append_failures,
            uptime_secs = self.start_time.elapsed().as_secs(),
            "Daemon shutdown complete"
        );
        Ok(report)
    }
}

impl Daemon {
    pub fn local_addr(&self) -> Result<SocketAddr, LifecycleError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve HTTP until shutdown is requested, then shut down gracefully
    pub async fn serve(self) -> Result<ShutdownReport, LifecycleError> {
        let Daemon { state, listener } = self;
        let app = server::router(state.app_state());
        let shutdown = state.shutdown_handle();

        info!("Listening on {}", listener.local_addr()?);
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.requested().await })
            .await;
        if let Err(e) = &served {
            error!("HTTP server failed: {}", e);
        }

        let report = state.shutdown().await?;
        served?;
        Ok(report)
    }
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<Daemon, LifecycleError> {
    let backend = open_backend(&config.backend).await?;
    startup_with_backend(config, backend).await
}

/// Start the daemon over an already opened backend
pub async fn startup_with_backend(
    config: &Config,
    backend: impl LogBackend,
) -> Result<Daemon, LifecycleError> {
    let start_time = Instant::now();

    // 1. Rebuild the store from the log BEFORE binding (no traffic until
    //    replay has completed)
    let store = Arc::new(Store::new());
    let options = LoggerOptions {
        queue_capacity: config.queue_capacity,
    };
    let (logger, replay) =
        initialize_durability(&store, TracedBackend::new(backend), options).await?;
    let logger = Arc::new(logger);

    info!(
        "Loaded state: {} keys from {} events (last sequence {})",
        replay.keys, replay.events, replay.last_sequence
    );

    // 2. Watch for append failures
    let shutdown = ShutdownHandle::new();
    let Some(errors) = logger.errors() else {
        cleanup_on_failure(&logger).await;
        return Err(LifecycleError::Backend(LogError::AlreadyRunning));
    };
    let monitor = tokio::spawn(monitor_append_errors(
        errors,
        config.on_append_error,
        shutdown.clone(),
    ));

    // 3. Bind (LAST - only after recovery succeeded)
    let listener = match TcpListener::bind(config.bind).await {
        Ok(listener) => listener,
        Err(e) => {
            cleanup_on_failure(&logger).await;
            return Err(LifecycleError::BindFailed(config.bind, e));
        }
    };

    info!("Daemon started on {}", config.bind);

    Ok(Daemon {
        state: DaemonState {
            config: config.clone(),
            app: AppState::new(Arc::clone(&store), Arc::clone(&logger)),
            store,
            logger,
            replay,
            start_time,
            shutdown,
            monitor,
        },
        listener,
    })
}

async fn open_backend(config: &BackendConfig) -> Result<Box<dyn LogBackend>, LifecycleError> {
    match config {
        BackendConfig::File(file) => {
            info!("Opening transaction log {}", file.path.display());
            let backend = FileBackend::open(&file.path, FileOptions { fsync: file.fsync })
                .await
                .map_err(LifecycleError::Backend)?;
            Ok(Box::new(backend))
        }
        BackendConfig::Postgres(pg) => {
            info!(
                "Connecting to transaction table {} on {}:{}",
                pg.table, pg.host, pg.port
            );
            let backend = PostgresBackend::connect(&pg.into())
                .await
                .map_err(LifecycleError::Backend)?;
            Ok(Box::new(backend))
        }
    }
}

/// Close the logger when startup is abandoned after recovery
async fn cleanup_on_failure(logger: &TransactionLogger) {
    if let Err(e) = logger.close().await {
        warn!("Failed to close transaction log during cleanup: {}", e);
    }
}

/// Log every append failure; under the shutdown policy, stop the daemon on the first
async fn monitor_append_errors(
    mut errors: mpsc::UnboundedReceiver<LogError>,
    policy: AppendErrorPolicy,
    shutdown: ShutdownHandle,
) -> MonitorOutcome {
    let mut outcome = MonitorOutcome::default();

    while let Some(e) = errors.recv().await {
        outcome.failures += 1;
        error!(failures = outcome.failures, "transaction log append failed: {}", e);

        if policy == AppendErrorPolicy::Shutdown && !shutdown.is_requested() {
            error!("store and log have diverged; shutting down");
            outcome.stopped_on_error = true;
            shutdown.request();
        }
    }

    outcome
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
