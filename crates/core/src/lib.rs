// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sw-core: the adapter / condition / fan-out core of switchyard
//!
//! This crate provides:
//! - Normalized occurrences and the fired events delivered to listeners
//! - The source adapter contract with push- and poll-driven bases
//! - A closed library of payload conditions
//! - The router: subscription registry, adapter lifetimes and listener fan-out
//! - Configuration for poll scheduling and log retention

pub mod adapter;
pub mod clock;
pub mod condition;
pub mod config;
pub mod error;
pub mod id;
pub mod occurrence;
pub mod router;
pub mod subscription;

pub use adapter::{
    AdapterState, Feed, Inlet, InletClosed, OccurrenceHandler, PollAdapter, PollConfig, Poller,
    PushAdapter, Sink, SinkSlot, SourceAdapter,
};
pub use clock::{Clock, FakeClock, SystemClock};
pub use condition::{Comparison, Condition, ConditionSet, TimeField};
pub use config::{Config, ConfigError, PollingConfig, RetentionConfig};
pub use error::{AdapterError, DispatchError, ListenerError, ProductionError, RouterError};
pub use id::{AdapterId, IdGen, SequentialIdGen, SubscriptionId, UuidIdGen};
pub use occurrence::{FiredEvent, Occurrence, Payload};
pub use router::{listener_fn, DispatchReport, FnListener, Listener, Router};
pub use subscription::{RegisteredSubscription, Subscription};
