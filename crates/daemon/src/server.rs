// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP interface
//!
//! Every mutation updates the store first, then queues the matching event on
//! the transaction log. Mutations are serialized so the log records them in
//! the order the store applied them. A request returns once its event is
//! enqueued, not once it is durable.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use kv_core::{Store, StoreError};
use kv_storage::{LogError, TransactionLogger};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

/// Shared handles for request handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub logger: Arc<TransactionLogger>,
    /// Held from store update until the event is queued
    writes: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(store: Arc<Store>, logger: Arc<TransactionLogger>) -> Self {
        Self {
            store,
            logger,
            writes: Arc::new(Mutex::new(())),
        }
    }

    /// Store a value and queue its put event as one step
    pub async fn put(&self, key: &str, value: &str) -> Result<(), ServerError> {
        let _order = self.writes.lock().await;
        self.store.put(key, value)?;
        self.logger.write_put(key, value).await?;
        Ok(())
    }

    /// Remove a key and queue its delete event as one step
    pub async fn delete(&self, key: &str) -> Result<(), ServerError> {
        let _order = self.writes.lock().await;
        self.store.delete(key)?;
        self.logger.write_delete(key).await?;
        Ok(())
    }
}

/// Errors returned to HTTP clients
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("transaction log unavailable: {0}")]
    Log(#[from] LogError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            ServerError::Store(_) | ServerError::Log(LogError::Unencodable(_)) => {
                StatusCode::BAD_REQUEST
            }
            ServerError::Log(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        (status, self.to_string()).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/healthz", get(healthz))
        .route("/status", get(status))
        .route("/v1/:key", get(get_key).put(put_key).delete(delete_key))
        .with_state(state)
}

async fn hello() -> &'static str {
    "Hello World!"
}

async fn healthz(State(state): State<AppState>) -> Result<&'static str, ServerError> {
    if state.logger.is_running() {
        Ok("ok")
    } else {
        Err(ServerError::Log(LogError::NotRunning))
    }
}

/// Plain-text counters for operators
async fn status(State(state): State<AppState>) -> String {
    format!(
        "keys: {}\nlast_sequence: {}\npending: {}\n",
        state.store.len(),
        state.logger.last_sequence(),
        state.logger.pending(),
    )
}

async fn put_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
    value: String,
) -> Result<StatusCode, ServerError> {
    debug!(key = %key, value_len = value.len(), "put");

    state.put(&key, &value).await?;
    Ok(StatusCode::CREATED)
}

async fn get_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<String, ServerError> {
    debug!(key = %key, "get");
    Ok(state.store.get(&key)?)
}

async fn delete_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<StatusCode, ServerError> {
    debug!(key = %key, "delete");

    state.delete(&key).await?;
    Ok(StatusCode::OK)
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
