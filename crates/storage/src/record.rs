// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line format of the flat-file log
//!
//! One event per line: `sequence<TAB>type<TAB>key<TAB>value<LF>`, with the
//! type written as its integer discriminant. Fields are never escaped;
//! events carrying a tab or line break are refused before encoding.

use kv_core::{Event, EventError, EventType};

const SEPARATOR: char = '\t';
const TERMINATOR: char = '\n';

/// Encode an event as a complete log line, terminator included
pub fn encode(event: &Event) -> Result<String, EventError> {
    event.validate()?;
    Ok(format!(
        "{}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}{TERMINATOR}",
        event.sequence,
        event.event_type.as_u8(),
        event.key,
        event.value
    ))
}

/// Decode one log line
///
/// `line` must still carry its terminator; a missing terminator means the
/// append that produced it never completed.
pub fn decode(line: &str) -> Result<Event, String> {
    let Some(body) = line.strip_suffix(TERMINATOR) else {
        return Err("record is not terminated (torn write)".to_string());
    };
    if body.is_empty() {
        return Err("empty record".to_string());
    }

    let fields: Vec<&str> = body.splitn(4, SEPARATOR).collect();
    let &[sequence, event_type, key, value] = fields.as_slice() else {
        return Err(format!("expected 4 fields, found {}", fields.len()));
    };

    let sequence: u64 = sequence
        .parse()
        .map_err(|_| format!("invalid sequence {sequence:?}"))?;
    if sequence == 0 {
        return Err("sequence 0 is never assigned".to_string());
    }

    let event_type = event_type
        .parse::<u8>()
        .map_err(|_| format!("invalid event type {event_type:?}"))
        .and_then(|raw| EventType::try_from(raw).map_err(|e| e.to_string()))?;

    if value.contains(SEPARATOR) {
        return Err("too many fields".to_string());
    }

    let event = Event {
        sequence,
        event_type,
        key: key.to_string(),
        value: value.to_string(),
    };
    event.validate().map_err(|e| e.to_string())?;
    Ok(event)
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
