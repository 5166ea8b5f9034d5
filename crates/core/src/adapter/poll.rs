// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Poll-driven adapter base: a fixed-interval loop around a [`Poller`]

use super::{AdapterState, Sink, SinkSlot, SourceAdapter, StateCell};
use crate::error::{AdapterError, ProductionError};
use crate::id::AdapterId;
use crate::occurrence::Occurrence;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

/// Default interval between polls
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(60);

/// Scheduling configuration for a poll-driven adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub update_interval: Duration,
}

impl PollConfig {
    pub fn every(update_interval: Duration) -> Self {
        Self { update_interval }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::every(DEFAULT_UPDATE_INTERVAL)
    }
}

/// The integration-specific half of a poll-driven adapter
#[async_trait]
pub trait Poller: Send + 'static {
    /// Acquire the external resource. Failure aborts `start`.
    async fn open(&mut self) -> Result<(), ProductionError> {
        Ok(())
    }

    /// Poll once and return the occurrences produced, oldest first
    async fn poll(&mut self) -> Result<Vec<Occurrence>, ProductionError>;
}

struct PollRun<P> {
    /// Present whenever no run loop owns the poller
    poller: Option<P>,
    cancel: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<P>>,
}

/// Reusable poll-driven [`SourceAdapter`].
///
/// The run loop checks for cancellation before sleeping and again on waking,
/// and the sleep itself is cut short by `stop`, so stop latency is bounded by
/// one in-flight poll.
pub struct PollAdapter<P: Poller> {
    id: AdapterId,
    config: PollConfig,
    sink: SinkSlot,
    state: StateCell,
    run: Mutex<PollRun<P>>,
}

impl<P: Poller> PollAdapter<P> {
    pub fn new(id: impl Into<AdapterId>, config: PollConfig, poller: P) -> Self {
        Self {
            id: id.into(),
            config,
            sink: SinkSlot::new(),
            state: StateCell::default(),
            run: Mutex::new(PollRun {
                poller: Some(poller),
                cancel: None,
                task: None,
            }),
        }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }
}

#[async_trait]
impl<P: Poller> SourceAdapter for PollAdapter<P> {
    fn id(&self) -> &AdapterId {
        &self.id
    }

    fn state(&self) -> AdapterState {
        self.state.get()
    }

    fn bind(&self, sink: Sink) {
        self.sink.bind(sink);
    }

    async fn start(&self) -> Result<(), AdapterError> {
        let mut run = self.run.lock().await;
        if run.task.is_some() {
            tracing::debug!(adapter = %self.id, "already running");
            return Ok(());
        }

        let sink = self
            .sink
            .get(&self.id)
            .map_err(|_| AdapterError::Unbound(self.id.clone()))?;

        let Some(mut poller) = run.poller.take() else {
            self.state.set(AdapterState::Idle);
            return Err(AdapterError::Start {
                adapter: self.id.clone(),
                reason: "poller was lost by a previous run".to_string(),
            });
        };

        if let Err(e) = poller.open().await {
            run.poller = Some(poller);
            self.state.set(AdapterState::Idle);
            return Err(AdapterError::Start {
                adapter: self.id.clone(),
                reason: e.to_string(),
            });
        }

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let task = tokio::spawn(poll_loop(
            self.id.clone(),
            poller,
            self.config.update_interval,
            sink,
            cancel_rx,
        ));
        run.cancel = Some(cancel_tx);
        run.task = Some(task);
        self.state.set(AdapterState::Running);

        tracing::info!(
            adapter = %self.id,
            interval_ms = self.config.update_interval.as_millis() as u64,
            "poll loop started"
        );
        Ok(())
    }

    async fn stop(&self) -> Result<(), AdapterError> {
        let mut run = self.run.lock().await;
        let Some(task) = run.task.take() else {
            return Ok(());
        };

        self.state.set(AdapterState::Stopping);
        if let Some(cancel) = run.cancel.take() {
            // The loop may already have exited on its own
            let _ = cancel.send(true);
        }

        let result = task.await;
        self.state.set(AdapterState::Stopped);
        match result {
            Ok(poller) => {
                run.poller = Some(poller);
                tracing::info!(adapter = %self.id, "poll loop stopped");
                Ok(())
            }
            Err(e) => Err(AdapterError::Stop {
                adapter: self.id.clone(),
                reason: e.to_string(),
            }),
        }
    }
}

async fn poll_loop<P: Poller>(
    adapter: AdapterId,
    mut poller: P,
    interval: Duration,
    sink: Sink,
    mut cancel: watch::Receiver<bool>,
) -> P {
    loop {
        if *cancel.borrow() {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = cancel.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }

        if *cancel.borrow() {
            break;
        }

        let occurrences = match poller.poll().await {
            Ok(occurrences) => occurrences,
            Err(e) => {
                tracing::warn!(adapter = %adapter, error = %e, "poll failed, continuing");
                continue;
            }
        };

        for occurrence in occurrences {
            if let Err(e) = sink.dispatch(occurrence).await {
                tracing::warn!(adapter = %adapter, error = %e, "poll loop exiting");
                return poller;
            }
        }
    }

    poller
}

#[cfg(test)]
#[path = "poll_tests.rs"]
mod tests;
