// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Source adapters for concrete external domains

pub mod dir_scan;
pub mod file_tail;
pub mod ticker;
pub mod traced;
pub mod webhook;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use dir_scan::{wildcard_match, ChangeKind, DirectoryScan};
pub use file_tail::FileTail;
pub use ticker::IntervalTicker;
pub use traced::TracedPoller;
pub use webhook::{WebhookError, WebhookFeed, WebhookHandle};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use fake::{AdapterCall, FakeAdapter};
