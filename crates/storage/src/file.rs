// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flat-file log backend
//!
//! Appends tab-separated records to a single text file. The file is opened
//! in append mode and never rewritten; replay reads it through a separate
//! handle from the first byte.

use crate::backend::LogBackend;
use crate::error::LogError;
use crate::record;
use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use kv_core::Event;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Options for the flat-file backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileOptions {
    /// Call `sync_data` after every append before reporting success
    pub fsync: bool,
}

impl Default for FileOptions {
    fn default() -> Self {
        Self { fsync: true }
    }
}

/// Transaction log stored as one line per event
pub struct FileBackend {
    path: PathBuf,
    file: Option<File>,
    options: FileOptions,
    /// File length after the last complete record
    len: u64,
    bytes_written: u64,
}

impl FileBackend {
    /// Open or create the log file at `path`
    pub async fn open(path: &Path, options: FileOptions) -> Result<Self, LogError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                LogError::Setup(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| LogError::Setup(format!("cannot open log file {}: {}", path.display(), e)))?;
        let len = file
            .metadata()
            .await
            .map_err(|e| LogError::Setup(format!("cannot stat log file {}: {}", path.display(), e)))?
            .len();

        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
            options,
            len,
            bytes_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes appended since open
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    async fn write_record(file: &mut File, line: &str, fsync: bool) -> std::io::Result<()> {
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        if fsync {
            file.sync_data().await?;
        }
        Ok(())
    }

    /// Cut the file back to the last complete record
    async fn rollback(&mut self) -> std::io::Result<()> {
        if let Some(file) = self.file.as_mut() {
            file.set_len(self.len).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl LogBackend for FileBackend {
    fn kind(&self) -> &'static str {
        "file"
    }

    async fn append(&mut self, event: &Event) -> Result<u64, LogError> {
        let line = record::encode(event)?;
        let file = self.file.as_mut().ok_or(LogError::Closed)?;

        // Leave no partial record behind
        if let Err(e) = Self::write_record(file, &line, self.options.fsync).await {
            if let Err(truncate) = self.rollback().await {
                tracing::error!(
                    path = %self.path.display(),
                    error = %truncate,
                    "failed to truncate partial record"
                );
            }
            return Err(e.into());
        }

        self.len += line.len() as u64;
        self.bytes_written += line.len() as u64;
        Ok(event.sequence)
    }

    fn replay(&mut self) -> BoxStream<'_, Result<Event, LogError>> {
        stream::try_unfold(Replay::Pending(self.path.clone()), Replay::next).boxed()
    }

    async fn close(&mut self) -> Result<(), LogError> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }
        Ok(())
    }
}

/// Replay cursor; the read handle is opened on first poll
enum Replay {
    Pending(PathBuf),
    Reading {
        reader: BufReader<File>,
        line: u64,
    },
}

impl Replay {
    async fn next(self) -> Result<Option<(Event, Replay)>, LogError> {
        let (mut reader, mut line) = match self {
            Replay::Pending(path) => (BufReader::new(File::open(&path).await?), 0),
            Replay::Reading { reader, line } => (reader, line),
        };

        let mut bytes = Vec::new();
        if reader.read_until(b'\n', &mut bytes).await? == 0 {
            return Ok(None);
        }
        line += 1;

        let text = String::from_utf8(bytes)
            .map_err(|e| LogError::corrupted(line, format!("invalid UTF-8: {e}")))?;
        let event = record::decode(&text).map_err(|reason| LogError::corrupted(line, reason))?;
        Ok(Some((event, Replay::Reading { reader, line })))
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
