// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events recorded in the transaction log
//!
//! An event is one durable mutation of a single key. Events are built
//! unsequenced by callers; the transaction logger stamps the sequence
//! number when the event is appended.

use std::fmt;
use thiserror::Error;

/// Characters that delimit fields and records in the flat log format.
///
/// Keys and values carrying any of these are refused at the store boundary,
/// so every accepted mutation has an unambiguous one-line encoding.
pub const RESERVED_CHARS: [char; 3] = ['\t', '\n', '\r'];

/// Returns true if `text` contains a field or record delimiter
pub fn contains_reserved(text: &str) -> bool {
    text.contains(RESERVED_CHARS)
}

/// Kind of mutation carried by an event.
///
/// Discriminants are the on-disk representation. Zero is reserved so a
/// zeroed or missing field is detected as corruption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventType {
    Delete = 1,
    Put = 2,
}

/// A stored event type value that does not name a known variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid event type: {0}")]
pub struct InvalidEventType(pub i64);

impl EventType {
    /// Integer representation used by every backend
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            EventType::Delete => "delete",
            EventType::Put => "put",
        }
    }
}

impl TryFrom<u8> for EventType {
    type Error = InvalidEventType;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(EventType::Delete),
            2 => Ok(EventType::Put),
            other => Err(InvalidEventType(i64::from(other))),
        }
    }
}

impl TryFrom<i16> for EventType {
    type Error = InvalidEventType;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_| InvalidEventType(i64::from(value)))
            .and_then(EventType::try_from)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One durable record of a single key mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Position in the log; 0 until the logger assigns one
    pub sequence: u64,
    pub event_type: EventType,
    pub key: String,
    /// Payload for `Put`; always empty for `Delete`
    pub value: String,
}

impl Event {
    /// Unsequenced put of `value` under `key`
    pub fn put(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            sequence: 0,
            event_type: EventType::Put,
            key: key.into(),
            value: value.into(),
        }
    }

    /// Unsequenced removal of `key`
    pub fn delete(key: impl Into<String>) -> Self {
        Self {
            sequence: 0,
            event_type: EventType::Delete,
            key: key.into(),
            value: String::new(),
        }
    }

    /// Stamp a sequence number
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn is_sequenced(&self) -> bool {
        self.sequence > 0
    }

    /// Check that the event can be written as a single log record
    pub fn validate(&self) -> Result<(), EventError> {
        if self.key.is_empty() {
            return Err(EventError::EmptyKey);
        }
        if contains_reserved(&self.key) {
            return Err(EventError::ReservedInKey(self.key.clone()));
        }
        if contains_reserved(&self.value) {
            return Err(EventError::ReservedInValue(self.key.clone()));
        }
        if self.event_type == EventType::Delete && !self.value.is_empty() {
            return Err(EventError::DeleteWithValue(self.key.clone()));
        }
        Ok(())
    }
}

/// Reasons an event cannot be recorded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("event key is empty")]
    EmptyKey,
    #[error("key {0:?} contains a reserved delimiter")]
    ReservedInKey(String),
    #[error("value for key {0:?} contains a reserved delimiter")]
    ReservedInValue(String),
    #[error("delete of key {0:?} carries a value")]
    DeleteWithValue(String),
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
