// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Push-driven adapter base: forwards what an external callback delivers

use super::{AdapterState, Sink, SinkSlot, SourceAdapter, StateCell};
use crate::error::{AdapterError, ProductionError};
use crate::id::AdapterId;
use crate::occurrence::Occurrence;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

type Delivery = Result<Occurrence, ProductionError>;

/// The inlet has been detached; the adapter is not running
#[derive(Debug, Error)]
#[error("inlet for adapter {0} is closed")]
pub struct InletClosed(pub AdapterId);

/// Thread-safe handle a [`Feed`] uses to push into its adapter.
///
/// `send` and `fail` never block and may be called from any thread,
/// including callbacks owned by foreign notification mechanisms.
#[derive(Debug, Clone)]
pub struct Inlet {
    adapter: AdapterId,
    tx: UnboundedSender<Delivery>,
}

impl Inlet {
    pub fn adapter(&self) -> &AdapterId {
        &self.adapter
    }

    pub fn send(&self, occurrence: Occurrence) -> Result<(), InletClosed> {
        self.tx
            .send(Ok(occurrence))
            .map_err(|_| InletClosed(self.adapter.clone()))
    }

    /// Report a failure to produce one occurrence; the adapter logs it
    pub fn fail(&self, error: ProductionError) -> Result<(), InletClosed> {
        self.tx
            .send(Err(error))
            .map_err(|_| InletClosed(self.adapter.clone()))
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The integration-specific half of a push-driven adapter
#[async_trait]
pub trait Feed: Send + 'static {
    /// Attach to the external notification source. Failure aborts `start`.
    async fn attach(&mut self, inlet: Inlet) -> Result<(), ProductionError>;

    /// Detach from the notification source and drop the inlet
    async fn detach(&mut self);
}

struct PushRun<F> {
    feed: F,
    cancel: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

/// Reusable push-driven [`SourceAdapter`].
///
/// A forwarder task drains the inlet in arrival order. `stop` detaches the
/// feed first, then forwards whatever was already queued before returning.
pub struct PushAdapter<F: Feed> {
    id: AdapterId,
    sink: SinkSlot,
    state: StateCell,
    run: Mutex<PushRun<F>>,
}

impl<F: Feed> PushAdapter<F> {
    pub fn new(id: impl Into<AdapterId>, feed: F) -> Self {
        Self {
            id: id.into(),
            sink: SinkSlot::new(),
            state: StateCell::default(),
            run: Mutex::new(PushRun {
                feed,
                cancel: None,
                task: None,
            }),
        }
    }
}

#[async_trait]
impl<F: Feed> SourceAdapter for PushAdapter<F> {
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

        let (tx, rx) = mpsc::unbounded_channel();
        let inlet = Inlet {
            adapter: self.id.clone(),
            tx,
        };
        if let Err(e) = run.feed.attach(inlet).await {
            self.state.set(AdapterState::Idle);
            return Err(AdapterError::Start {
                adapter: self.id.clone(),
                reason: e.to_string(),
            });
        }

        let (cancel_tx, cancel_rx) = watch::channel(false);
        run.task = Some(tokio::spawn(forward_loop(
            self.id.clone(),
            rx,
            sink,
            cancel_rx,
        )));
        run.cancel = Some(cancel_tx);
        self.state.set(AdapterState::Running);

        tracing::info!(adapter = %self.id, "push feed attached");
        Ok(())
    }

    async fn stop(&self) -> Result<(), AdapterError> {
        let mut run = self.run.lock().await;
        let Some(task) = run.task.take() else {
            return Ok(());
        };

        self.state.set(AdapterState::Stopping);
        run.feed.detach().await;
        if let Some(cancel) = run.cancel.take() {
            let _ = cancel.send(true);
        }

        let result = task.await;
        self.state.set(AdapterState::Stopped);
        result.map_err(|e| AdapterError::Stop {
            adapter: self.id.clone(),
            reason: e.to_string(),
        })?;

        tracing::info!(adapter = %self.id, "push feed detached");
        Ok(())
    }
}

async fn forward_loop(
    adapter: AdapterId,
    mut rx: UnboundedReceiver<Delivery>,
    sink: Sink,
    mut cancel: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;
            changed = cancel.changed() => {
                if changed.is_err() || *cancel.borrow() {
                    break;
                }
            }
            delivery = rx.recv() => {
                let Some(delivery) = delivery else {
                    // Every inlet is gone
                    return;
                };
                if !forward(&adapter, &sink, delivery).await {
                    return;
                }
            }
        }
    }

    // Deliveries accepted before detach are still forwarded
    while let Ok(delivery) = rx.try_recv() {
        if !forward(&adapter, &sink, delivery).await {
            return;
        }
    }
}

/// Returns false when the router is unreachable and forwarding should end
async fn forward(adapter: &AdapterId, sink: &Sink, delivery: Delivery) -> bool {
    match delivery {
        Ok(occurrence) => match sink.dispatch(occurrence).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(adapter = %adapter, error = %e, "push forwarder exiting");
                false
            }
        },
        Err(e) => {
            tracing::warn!(adapter = %adapter, error = %e, "dropped failed push delivery");
            true
        }
    }
}

#[cfg(test)]
#[path = "push_tests.rs"]
mod tests;
