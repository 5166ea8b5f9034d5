// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Bounded per-owner log storage

mod entry;
mod entry_store;
mod layer;
mod log_store;

pub use entry::{EntryId, LogEntry, LogLevel, OwnerId, Provenance, RetentionPolicy, UnknownLevel};
pub use entry_store::{EntryStore, JsonlEntryStore, MemoryEntryStore, StoreError};
pub use layer::LogStoreLayer;
pub use log_store::{LogStore, LogStoreError, DEFAULT_TEMPLATE};
