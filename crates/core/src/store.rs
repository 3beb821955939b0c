// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concurrent in-memory key-value store
//!
//! The store is the system of record for current state. It performs no I/O;
//! durability is the transaction logger's job. Many readers may hold the
//! lock at once, a writer excludes everyone else for the length of one
//! mutation.

use crate::event::{contains_reserved, Event, EventType};
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

/// Errors surfaced by store operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("no such key: {0}")]
    NotFound(String),
    #[error("key must not be empty")]
    EmptyKey,
    #[error("key {0:?} contains a tab or line break")]
    InvalidKey(String),
    #[error("value for key {0:?} contains a tab or line break")]
    InvalidValue(String),
}

/// String-to-string map guarded by a read/write lock
#[derive(Debug, Default)]
pub struct Store {
    entries: RwLock<HashMap<String, String>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite `key`
    pub fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        check_key(key)?;
        if contains_reserved(value) {
            return Err(StoreError::InvalidValue(key.to_string()));
        }
        self.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Current value for `key`
    pub fn get(&self, key: &str) -> Result<String, StoreError> {
        self.read()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    /// Remove `key`; removing an absent key succeeds
    pub fn delete(&self, key: &str) -> Result<(), StoreError> {
        check_key(key)?;
        self.write().remove(key);
        Ok(())
    }

    /// Apply a logged event
    pub fn apply(&self, event: &Event) -> Result<(), StoreError> {
        match event.event_type {
            EventType::Put => self.put(&event.key, &event.value),
            EventType::Delete => self.delete(&event.key),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Ordered copy of the current contents
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Swap in the contents of `other`, discarding what was here
    pub fn replace_with(&self, other: Store) {
        let entries = other
            .entries
            .into_inner()
            .unwrap_or_else(|e| e.into_inner());
        *self.write() = entries;
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, String>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, String>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn check_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() {
        return Err(StoreError::EmptyKey);
    }
    if contains_reserved(key) {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
