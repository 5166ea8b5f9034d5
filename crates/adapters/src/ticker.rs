// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduled ticks: one occurrence per poll interval

use async_trait::async_trait;
use serde_json::json;
use sw_core::{
    AdapterId, Clock, Occurrence, Payload, PollAdapter, PollConfig, Poller, ProductionError,
    SystemClock,
};

/// Poller producing `{ "tick": n, "timestamp": rfc3339 }` on every poll.
///
/// Ticks count from 1 and keep counting across restarts of the same adapter.
pub struct IntervalTicker<C: Clock = SystemClock> {
    category: String,
    clock: C,
    ticks: u64,
}

impl IntervalTicker<SystemClock> {
    pub fn new(category: impl Into<String>) -> Self {
        Self::with_clock(category, SystemClock)
    }
}

impl<C: Clock + 'static> IntervalTicker<C> {
    pub fn with_clock(category: impl Into<String>, clock: C) -> Self {
        Self {
            category: category.into(),
            clock,
            ticks: 0,
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn into_adapter(self, id: impl Into<AdapterId>, config: PollConfig) -> PollAdapter<Self> {
        PollAdapter::new(id, config, self)
    }
}

#[async_trait]
impl<C: Clock + 'static> Poller for IntervalTicker<C> {
    async fn poll(&mut self) -> Result<Vec<Occurrence>, ProductionError> {
        self.ticks += 1;
        let now = self.clock.now();

        let mut payload = Payload::new();
        payload.insert("tick".to_string(), json!(self.ticks));
        payload.insert("timestamp".to_string(), json!(now.to_rfc3339()));

        Ok(vec![Occurrence::at(self.category.clone(), payload, now)])
    }
}

#[cfg(test)]
#[path = "ticker_tests.rs"]
mod tests;
