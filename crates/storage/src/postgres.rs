// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Relational log backend (PostgreSQL)
//!
//! Events are rows of a single table whose `BIGSERIAL` primary key is the
//! sequence number. The database assigns sequences on insert and reports
//! them back to the logger; replay reads the table ordered by that key.

use crate::backend::LogBackend;
use crate::error::LogError;
use async_trait::async_trait;
use futures_util::stream::{BoxStream, StreamExt};
use kv_core::{Event, EventType};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;
use std::str::FromStr;

pub const DEFAULT_TABLE: &str = "transactions";

/// Connection parameters for the relational backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgParams {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    pub table: String,
}

impl Default for PgParams {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "kvd".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
            table: DEFAULT_TABLE.to_string(),
        }
    }
}

/// Transaction log stored as rows of one table
#[derive(Debug, Clone)]
pub struct PostgresBackend {
    pool: PgPool,
    table: String,
    insert_sql: String,
    select_sql: String,
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    sequence: i64,
    event_type: i16,
    key: String,
    value: String,
}

impl TryFrom<TransactionRow> for Event {
    type Error = LogError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let sequence = u64::try_from(row.sequence)
            .ok()
            .filter(|s| *s > 0)
            .ok_or_else(|| LogError::corrupted(0, format!("invalid sequence {}", row.sequence)))?;
        let event_type = EventType::try_from(row.event_type)
            .map_err(|e| LogError::corrupted(sequence, e.to_string()))?;

        Ok(Event {
            sequence,
            event_type,
            key: row.key,
            value: row.value,
        })
    }
}

impl PostgresBackend {
    /// Connect and make sure the log table exists
    pub async fn connect(params: &PgParams) -> Result<Self, LogError> {
        let options = PgConnectOptions::new()
            .host(&params.host)
            .port(params.port)
            .database(&params.dbname)
            .username(&params.user)
            .password(&params.password)
            .ssl_mode(PgSslMode::Disable);

        Self::connect_with(options, &params.table).await
    }

    /// Connect using a `postgres://` URL
    pub async fn connect_url(url: &str, table: &str) -> Result<Self, LogError> {
        let options = PgConnectOptions::from_str(url)
            .map_err(|e| LogError::Setup(format!("invalid database url: {e}")))?;

        Self::connect_with(options, table).await
    }

    async fn connect_with(options: PgConnectOptions, table: &str) -> Result<Self, LogError> {
        check_table_name(table)?;

        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect_with(options)
            .await
            .map_err(|e| LogError::Setup(format!("failed to open db connection: {e}")))?;

        let backend = Self {
            pool,
            table: table.to_string(),
            insert_sql: format!(
                "INSERT INTO {table} (event_type, key, value) VALUES ($1, $2, $3) RETURNING sequence"
            ),
            select_sql: format!(
                "SELECT sequence, event_type, key, value FROM {table} ORDER BY sequence"
            ),
        };

        let exists = backend
            .table_exists()
            .await
            .map_err(|e| LogError::Setup(format!("failed to verify table exists: {e}")))?;
        if !exists {
            backend
                .create_table()
                .await
                .map_err(|e| LogError::Setup(format!("failed to create table: {e}")))?;
            tracing::info!(table = %backend.table, "created transaction table");
        }

        Ok(backend)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    async fn table_exists(&self) -> Result<bool, sqlx::Error> {
        let found: Option<String> = sqlx::query_scalar("SELECT to_regclass($1)::text")
            .bind(format!("public.{}", self.table))
            .fetch_one(&self.pool)
            .await?;

        Ok(found.is_some())
    }

    async fn create_table(&self) -> Result<(), sqlx::Error> {
        let query = format!(
            r#"
            CREATE TABLE {} (
                sequence BIGSERIAL PRIMARY KEY,
                event_type SMALLINT,
                key TEXT,
                value TEXT
            )
            "#,
            self.table
        );
        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl LogBackend for PostgresBackend {
    fn kind(&self) -> &'static str {
        "postgres"
    }

    async fn append(&mut self, event: &Event) -> Result<u64, LogError> {
        event.validate()?;

        let sequence: i64 = sqlx::query_scalar(&self.insert_sql)
            .bind(i16::from(event.event_type.as_u8()))
            .bind(&event.key)
            .bind(&event.value)
            .fetch_one(&self.pool)
            .await?;

        u64::try_from(sequence)
            .map_err(|_| LogError::corrupted(0, format!("invalid sequence {sequence}")))
    }

    fn replay(&mut self) -> BoxStream<'_, Result<Event, LogError>> {
        sqlx::query_as::<_, TransactionRow>(&self.select_sql)
            .fetch(&self.pool)
            .map(|row| row.map_err(LogError::from).and_then(Event::try_from))
            .boxed()
    }

    async fn close(&mut self) -> Result<(), LogError> {
        self.pool.close().await;
        Ok(())
    }
}

/// Table names are interpolated into SQL, so only plain identifiers pass
fn check_table_name(table: &str) -> Result<(), LogError> {
    let valid = !table.is_empty()
        && table
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !table.starts_with(|c: char| c.is_ascii_digit());

    if valid {
        Ok(())
    } else {
        Err(LogError::Setup(format!("invalid table name {table:?}")))
    }
}

#[cfg(test)]
#[path = "postgres_tests.rs"]
mod tests;
