// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kv-core: data model for the durable key-value service
//!
//! This crate provides:
//! - The `Event` record appended to the transaction log
//! - The concurrent in-memory `Store` that log replay rebuilds

pub mod event;
pub mod store;

pub use event::{contains_reserved, Event, EventError, EventType, InvalidEventType};
pub use store::{Store, StoreError};
