// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake source adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use sw_core::{
    AdapterError, AdapterId, AdapterState, DispatchError, DispatchReport, Occurrence, Payload,
    Sink, SinkSlot, SourceAdapter,
};

/// Recorded lifecycle call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterCall {
    Bind,
    Start,
    Stop,
}

#[derive(Default)]
struct FakeState {
    state: AdapterState,
    calls: Vec<AdapterCall>,
    fail_start: Option<String>,
}

/// Adapter that produces only when a test calls [`FakeAdapter::emit`]
pub struct FakeAdapter {
    id: AdapterId,
    category: String,
    sink: SinkSlot,
    inner: Arc<Mutex<FakeState>>,
}

impl FakeAdapter {
    pub fn new(id: impl Into<AdapterId>) -> Self {
        Self {
            id: id.into(),
            category: "fake".to_string(),
            sink: SinkSlot::new(),
            inner: Arc::default(),
        }
    }

    /// Category stamped on emitted occurrences
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<AdapterCall> {
        self.lock().calls.clone()
    }

    pub fn start_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| **c == AdapterCall::Start)
            .count()
    }

    pub fn stop_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| **c == AdapterCall::Stop)
            .count()
    }

    /// Make the next starts fail with `reason`, or succeed again with `None`
    pub fn set_fail_start(&self, reason: Option<&str>) {
        self.lock().fail_start = reason.map(str::to_string);
    }

    /// Produce one occurrence through the bound sink
    pub async fn emit(&self, payload: Payload) -> Result<DispatchReport, DispatchError> {
        let sink = self.sink.get(&self.id)?;
        sink.dispatch(Occurrence::new(self.category.clone(), payload))
            .await
    }

    /// Produce one occurrence from a JSON object; other values emit an empty payload
    pub async fn emit_json(&self, value: Value) -> Result<DispatchReport, DispatchError> {
        let payload = match value {
            Value::Object(map) => map,
            _ => Payload::new(),
        };
        self.emit(payload).await
    }
}

#[async_trait]
impl SourceAdapter for FakeAdapter {
    fn id(&self) -> &AdapterId {
        &self.id
    }

    fn state(&self) -> AdapterState {
        self.lock().state
    }

    fn bind(&self, sink: Sink) {
        self.lock().calls.push(AdapterCall::Bind);
        self.sink.bind(sink);
    }

    async fn start(&self) -> Result<(), AdapterError> {
        let mut inner = self.lock();
        inner.calls.push(AdapterCall::Start);
        if let Some(reason) = inner.fail_start.clone() {
            inner.state = AdapterState::Idle;
            return Err(AdapterError::Start {
                adapter: self.id.clone(),
                reason,
            });
        }
        if !self.sink.is_bound() {
            return Err(AdapterError::Unbound(self.id.clone()));
        }
        inner.state = AdapterState::Running;
        Ok(())
    }

    async fn stop(&self) -> Result<(), AdapterError> {
        let mut inner = self.lock();
        inner.calls.push(AdapterCall::Stop);
        if inner.state == AdapterState::Running {
            inner.state = AdapterState::Stopped;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
