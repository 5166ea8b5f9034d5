// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types shared by adapters, the router and listeners

use crate::id::{AdapterId, SubscriptionId};
use thiserror::Error;

/// Errors from adapter lifecycle transitions
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The adapter could not acquire its external resource
    #[error("adapter {adapter} failed to start: {reason}")]
    Start { adapter: AdapterId, reason: String },
    /// The adapter was started before a router sink was bound
    #[error("adapter {0} has no router bound")]
    Unbound(AdapterId),
    #[error("adapter {adapter} failed to stop: {reason}")]
    Stop { adapter: AdapterId, reason: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A failure producing a single occurrence; the run loop survives it
#[derive(Debug, Error)]
pub enum ProductionError {
    #[error("poll failed: {0}")]
    Poll(String),
    #[error("malformed input: {0}")]
    Malformed(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors handing an occurrence to the router
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("adapter {0} dispatched before being bound to a router")]
    Unbound(AdapterId),
    #[error("router behind adapter {0} has been dropped")]
    RouterGone(AdapterId),
}

/// Error returned by a listener; logged and isolated by the router
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ListenerError {
    message: String,
}

impl ListenerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for ListenerError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for ListenerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Errors surfaced by router registration and lifecycle calls
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("adapter start failed: {0}")]
    AdapterStart(#[source] AdapterError),
    #[error("adapter stop failed: {0}")]
    AdapterStop(#[source] AdapterError),
    #[error("subscription not found: {0}")]
    UnknownSubscription(SubscriptionId),
    #[error("a different adapter is already registered as {0}")]
    AdapterIdConflict(AdapterId),
}
