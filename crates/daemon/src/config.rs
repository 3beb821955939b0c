// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration
//!
//! Read from an optional TOML file, then overridden by `KVD_*` environment
//! variables and finally by command-line flags.

use kv_storage::{PgParams, DEFAULT_QUEUE_CAPACITY};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_BIND: &str = "KVD_BIND";
pub const ENV_LOG_FILE: &str = "KVD_LOG_FILE";
pub const ENV_WAL_PATH: &str = "KVD_WAL_PATH";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid bind address {0:?}")]
    InvalidBind(String),

    #[error("queue_capacity must be at least 1")]
    InvalidCapacity,
}

/// What the daemon does when the log rejects an append
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppendErrorPolicy {
    /// Stop serving; the store has diverged from the log
    #[default]
    Shutdown,
    /// Log the failure and keep serving
    Log,
}

/// Daemon configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    /// Daemon log output; stderr when unset
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default)]
    pub on_append_error: AppendErrorPolicy,
    #[serde(default)]
    pub backend: BackendConfig,
}

/// Which transaction log backend to open
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    File(FileConfig),
    Postgres(PostgresConfig),
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::File(FileConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileConfig {
    #[serde(default = "default_wal_path")]
    pub path: PathBuf,
    #[serde(default = "default_true")]
    pub fsync: bool,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            path: default_wal_path(),
            fsync: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    pub table: String,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        let params = PgParams::default();
        Self {
            host: params.host,
            port: params.port,
            dbname: params.dbname,
            user: params.user,
            password: params.password,
            table: params.table,
        }
    }
}

impl From<&PostgresConfig> for PgParams {
    fn from(config: &PostgresConfig) -> Self {
        PgParams {
            host: config.host.clone(),
            port: config.port,
            dbname: config.dbname.clone(),
            user: config.user.clone(),
            password: config.password.clone(),
            table: config.table.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            log_file: None,
            queue_capacity: default_queue_capacity(),
            on_append_error: AppendErrorPolicy::default(),
            backend: BackendConfig::default(),
        }
    }
}

impl Config {
    /// Load from `path`, or defaults when no file is given
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Apply `KVD_*` overrides using `lookup` to read variables
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(bind) = lookup(ENV_BIND) {
            self.bind = bind.parse().map_err(|_| ConfigError::InvalidBind(bind))?;
        }
        if let Some(log_file) = lookup(ENV_LOG_FILE) {
            self.log_file = Some(PathBuf::from(log_file));
        }
        // Only meaningful for the file backend
        if let (Some(wal_path), BackendConfig::File(file)) = (lookup(ENV_WAL_PATH), &mut self.backend)
        {
            file.path = PathBuf::from(wal_path);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::InvalidCapacity);
        }
        Ok(())
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_wal_path() -> PathBuf {
    PathBuf::from("transaction.log")
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
