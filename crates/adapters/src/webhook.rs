// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbound webhook payloads pushed through an in-process handle
//!
//! The HTTP layer lives elsewhere; it hands each request body to
//! [`WebhookHandle::deliver`] and maps [`WebhookError::Stopped`] to a
//! "service unavailable" response.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use sw_core::{AdapterId, Feed, Inlet, Occurrence, ProductionError, PushAdapter};
use thiserror::Error;

pub const DEFAULT_CATEGORY: &str = "webhook";

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("webhook adapter is not running")]
    Stopped,
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),
}

type InletSlot = Arc<Mutex<Option<Inlet>>>;

/// Push feed for webhook payloads
pub struct WebhookFeed {
    slot: InletSlot,
}

impl WebhookFeed {
    /// Create a feed and the handle that delivers into it
    pub fn new(category: impl Into<String>) -> (Self, WebhookHandle) {
        let slot = InletSlot::default();
        let handle = WebhookHandle {
            slot: Arc::clone(&slot),
            category: category.into(),
        };
        (Self { slot }, handle)
    }

    /// Build a ready-to-register adapter together with its handle
    pub fn adapter(id: impl Into<AdapterId>, category: impl Into<String>) -> (PushAdapter<Self>, WebhookHandle) {
        let (feed, handle) = Self::new(category);
        (PushAdapter::new(id, feed), handle)
    }
}

#[async_trait]
impl Feed for WebhookFeed {
    async fn attach(&mut self, inlet: Inlet) -> Result<(), ProductionError> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(inlet);
        Ok(())
    }

    async fn detach(&mut self) {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).take();
    }
}

/// Cloneable, thread-safe entry point for webhook bodies
#[derive(Clone)]
pub struct WebhookHandle {
    slot: InletSlot,
    category: String,
}

impl WebhookHandle {
    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn is_accepting(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|inlet| !inlet.is_closed())
    }

    /// Accept one payload. Objects become occurrences; any other JSON value
    /// is reported to the adapter as a production failure.
    pub fn deliver(&self, body: Value) -> Result<(), WebhookError> {
        let slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        let inlet = slot.as_ref().ok_or(WebhookError::Stopped)?;

        let sent = match Occurrence::from_json(self.category.clone(), body) {
            Some(occurrence) => {
                tracing::debug!(adapter = %inlet.adapter(), "received webhook payload");
                inlet.send(occurrence)
            }
            None => inlet.fail(ProductionError::Malformed(
                "webhook payload is not a JSON object".to_string(),
            )),
        };
        sent.map_err(|_| WebhookError::Stopped)
    }

    /// Parse and deliver a raw request body
    pub fn deliver_str(&self, body: &str) -> Result<(), WebhookError> {
        self.deliver(serde_json::from_str(body)?)
    }
}

#[cfg(test)]
#[path = "webhook_tests.rs"]
mod tests;
