// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced poller wrapper for consistent observability

use async_trait::async_trait;
use sw_core::{Occurrence, Poller, ProductionError};
use tracing::Instrument;

/// Wrapper that adds spans and timing to any Poller
pub struct TracedPoller<P> {
    name: String,
    inner: P,
    polls: u64,
}

impl<P> TracedPoller<P> {
    pub fn new(name: impl Into<String>, inner: P) -> Self {
        Self {
            name: name.into(),
            inner,
            polls: 0,
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: Poller> Poller for TracedPoller<P> {
    async fn open(&mut self) -> Result<(), ProductionError> {
        let span = tracing::info_span!("poller.open", poller = %self.name);
        async {
            let start = std::time::Instant::now();
            let result = self.inner.open().await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(()) => tracing::info!(elapsed_ms, "opened"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "open failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn poll(&mut self) -> Result<Vec<Occurrence>, ProductionError> {
        self.polls += 1;
        let span = tracing::debug_span!("poller.poll", poller = %self.name, n = self.polls);
        async {
            let start = std::time::Instant::now();
            let result = self.inner.poll().await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(occurrences) if occurrences.is_empty() => {
                    tracing::trace!(elapsed_ms, "nothing new")
                }
                Ok(occurrences) => {
                    tracing::debug!(elapsed_ms, produced = occurrences.len(), "polled")
                }
                Err(e) => tracing::warn!(elapsed_ms, error = %e, "poll failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
