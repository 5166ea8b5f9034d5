// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Source adapter contract and its two reusable scheduling bases
//!
//! Every integration that watches an external domain implements
//! [`SourceAdapter`], usually by composing one of:
//! - [`PushAdapter`] with a [`Feed`]: an external callback pushes through an [`Inlet`]
//! - [`PollAdapter`] with a [`Poller`]: a timed loop polls and produces
//!
//! Adapters hand occurrences to the router through a bound [`Sink`].

mod poll;
mod push;

pub use poll::{PollAdapter, PollConfig, Poller, DEFAULT_UPDATE_INTERVAL};
pub use push::{Feed, Inlet, InletClosed, PushAdapter};

use crate::error::{AdapterError, DispatchError};
use crate::id::AdapterId;
use crate::occurrence::Occurrence;
use crate::router::DispatchReport;
use async_trait::async_trait;
use std::fmt;
use std::sync::{Mutex, Weak};

/// Lifecycle state of a source adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdapterState {
    #[default]
    Idle,
    Running,
    Stopping,
    Stopped,
}

impl fmt::Display for AdapterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterState::Idle => write!(f, "idle"),
            AdapterState::Running => write!(f, "running"),
            AdapterState::Stopping => write!(f, "stopping"),
            AdapterState::Stopped => write!(f, "stopped"),
        }
    }
}

/// A component that watches one external domain and produces occurrences.
///
/// Once registered with a router, only the router calls `bind`, `start` and
/// `stop`. `start` is a no-op while running; `stop` is a no-op unless
/// running, and returns only after the run loop has ceased.
#[async_trait]
pub trait SourceAdapter: Send + Sync + 'static {
    fn id(&self) -> &AdapterId;

    fn state(&self) -> AdapterState;

    /// Bind the sink through which produced occurrences reach the router
    fn bind(&self, sink: Sink);

    async fn start(&self) -> Result<(), AdapterError>;

    async fn stop(&self) -> Result<(), AdapterError>;
}

/// Receiving side of a sink, implemented by the router
#[async_trait]
pub trait OccurrenceHandler: Send + Sync {
    async fn dispatch(&self, source: &AdapterId, occurrence: Occurrence) -> DispatchReport;
}

/// Handle bound into an adapter at registration time.
///
/// Holds only a weak reference to the router, so adapters never keep a
/// dropped router alive.
#[derive(Clone)]
pub struct Sink {
    adapter: AdapterId,
    target: Weak<dyn OccurrenceHandler>,
}

impl Sink {
    pub fn new(adapter: AdapterId, target: Weak<dyn OccurrenceHandler>) -> Self {
        Self { adapter, target }
    }

    pub fn adapter(&self) -> &AdapterId {
        &self.adapter
    }

    /// Hand an occurrence to the router and wait for its listeners
    pub async fn dispatch(&self, occurrence: Occurrence) -> Result<DispatchReport, DispatchError> {
        let target = self
            .target
            .upgrade()
            .ok_or_else(|| DispatchError::RouterGone(self.adapter.clone()))?;
        Ok(target.dispatch(&self.adapter, occurrence).await)
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("adapter", &self.adapter)
            .field("connected", &(self.target.strong_count() > 0))
            .finish()
    }
}

/// Slot holding an adapter's bound sink
#[derive(Debug, Default)]
pub struct SinkSlot {
    sink: Mutex<Option<Sink>>,
}

impl SinkSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&self, sink: Sink) {
        *self.sink.lock().unwrap_or_else(|e| e.into_inner()) = Some(sink);
    }

    pub fn is_bound(&self) -> bool {
        self.sink
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// The bound sink, or `DispatchError::Unbound` for the given adapter
    pub fn get(&self, adapter: &AdapterId) -> Result<Sink, DispatchError> {
        self.sink
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| DispatchError::Unbound(adapter.clone()))
    }
}

/// Adapter state shared between the lifecycle methods and `state()`
#[derive(Debug, Default)]
pub(crate) struct StateCell(Mutex<AdapterState>);

impl StateCell {
    pub(crate) fn get(&self) -> AdapterState {
        *self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn set(&self, state: AdapterState) {
        *self.0.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }
}
