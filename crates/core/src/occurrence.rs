// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Normalized occurrences and the fired events synthesized from them

use crate::id::SubscriptionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Payload carried by an occurrence: string keys to arbitrary JSON values
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// One external happening, normalized by the adapter that observed it.
///
/// Occurrences have no identity beyond their category and payload; matching
/// is done by predicate, never by equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Occurrence {
    pub category: String,
    pub payload: Payload,
    pub produced_at: DateTime<Utc>,
}

impl Occurrence {
    /// Create an occurrence stamped with the current time
    pub fn new(category: impl Into<String>, payload: Payload) -> Self {
        Self::at(category, payload, Utc::now())
    }

    /// Create an occurrence with an explicit production time
    pub fn at(category: impl Into<String>, payload: Payload, produced_at: DateTime<Utc>) -> Self {
        Self {
            category: category.into(),
            payload,
            produced_at,
        }
    }

    /// Build an occurrence from a JSON value, which must be an object
    pub fn from_json(category: impl Into<String>, value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Object(payload) => Some(Self::new(category, payload)),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.payload.get(key)
    }
}

/// The artifact delivered to listeners when a subscription matches
#[derive(Debug, Clone)]
pub struct FiredEvent {
    pub subscription_id: SubscriptionId,
    /// Category of the subscription that fired (listeners are keyed by it)
    pub category: String,
    pub occurrence: Arc<Occurrence>,
    pub fired_at: DateTime<Utc>,
}

impl FiredEvent {
    pub fn new(
        subscription_id: SubscriptionId,
        category: impl Into<String>,
        occurrence: Arc<Occurrence>,
    ) -> Self {
        Self {
            subscription_id,
            category: category.into(),
            occurrence,
            fired_at: Utc::now(),
        }
    }

    pub fn payload(&self) -> &Payload {
        &self.occurrence.payload
    }
}
