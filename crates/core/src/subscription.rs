// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subscriptions: an adapter, a condition set and the category they fire

use crate::adapter::SourceAdapter;
use crate::condition::{Condition, ConditionSet};
use crate::id::{AdapterId, SubscriptionId};
use crate::occurrence::Payload;
use std::fmt;
use std::sync::Arc;

/// A subscription request, handed to [`Router::register`](crate::Router::register).
///
/// The router takes over the adapter; the registered subscription keeps only
/// the adapter's id.
#[derive(Clone)]
pub struct Subscription {
    adapter: Arc<dyn SourceAdapter>,
    conditions: ConditionSet,
    category: String,
}

impl Subscription {
    /// Subscribe to every occurrence of `adapter`, firing `category`
    pub fn new(adapter: Arc<dyn SourceAdapter>, category: impl Into<String>) -> Self {
        Self {
            adapter,
            conditions: ConditionSet::always(),
            category: category.into(),
        }
    }

    pub fn with_conditions(mut self, conditions: ConditionSet) -> Self {
        self.conditions = conditions;
        self
    }

    /// Add one clause to the condition set
    pub fn when(mut self, condition: Condition) -> Self {
        self.conditions = self.conditions.and(condition);
        self
    }

    pub fn adapter(&self) -> &Arc<dyn SourceAdapter> {
        &self.adapter
    }

    pub fn adapter_id(&self) -> &AdapterId {
        self.adapter.id()
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn conditions(&self) -> &ConditionSet {
        &self.conditions
    }

    pub fn check_conditions(&self, payload: &Payload) -> bool {
        self.conditions.check(payload)
    }

    pub(crate) fn into_parts(self) -> (Arc<dyn SourceAdapter>, ConditionSet, String) {
        (self.adapter, self.conditions, self.category)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("adapter", self.adapter.id())
            .field("category", &self.category)
            .field("conditions", &self.conditions)
            .finish()
    }
}

/// A subscription as held by the router's registry
#[derive(Debug, Clone)]
pub struct RegisteredSubscription {
    pub id: SubscriptionId,
    pub adapter_id: AdapterId,
    pub conditions: ConditionSet,
    pub category: String,
}

impl RegisteredSubscription {
    pub fn check_conditions(&self, payload: &Payload) -> bool {
        self.conditions.check(payload)
    }
}
