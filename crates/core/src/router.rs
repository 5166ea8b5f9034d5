// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Router: the subscription registry, adapter lifetimes and listener fan-out
//!
//! Registry and listener mutation happens under one lock that is never held
//! across an await. Lifecycle transitions (which await adapter start/stop)
//! are serialized by a second, async lock. Matching and listener invocation
//! run outside both.

use crate::adapter::{OccurrenceHandler, Sink, SourceAdapter};
use crate::error::{ListenerError, RouterError};
use crate::id::{AdapterId, IdGen, SubscriptionId, UuidIdGen};
use crate::occurrence::{FiredEvent, Occurrence};
use crate::subscription::{RegisteredSubscription, Subscription};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// Callback invoked with each fired event of the category it is registered for
#[async_trait]
pub trait Listener: Send + Sync {
    async fn on_fired(&self, event: &FiredEvent) -> Result<(), ListenerError>;
}

/// Adapts a synchronous closure into a [`Listener`]
pub struct FnListener<F>(F);

#[async_trait]
impl<F> Listener for FnListener<F>
where
    F: Fn(&FiredEvent) -> Result<(), ListenerError> + Send + Sync,
{
    async fn on_fired(&self, event: &FiredEvent) -> Result<(), ListenerError> {
        (self.0)(event)
    }
}

/// Wrap a closure as a shareable listener
pub fn listener_fn<F>(f: F) -> Arc<dyn Listener>
where
    F: Fn(&FiredEvent) -> Result<(), ListenerError> + Send + Sync + 'static,
{
    Arc::new(FnListener(f))
}

/// Outcome of dispatching one occurrence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Subscriptions whose conditions held
    pub matched: usize,
    /// Listener invocations that succeeded
    pub delivered: usize,
    /// Listener invocations that returned an error
    pub failed: usize,
}

struct AdapterSlot {
    adapter: Arc<dyn SourceAdapter>,
    refs: usize,
}

#[derive(Default)]
struct Registry {
    /// In registration order
    subscriptions: Vec<Arc<RegisteredSubscription>>,
    adapters: HashMap<AdapterId, AdapterSlot>,
    listeners: HashMap<String, Vec<Arc<dyn Listener>>>,
}

struct RouterShared<G> {
    registry: Mutex<Registry>,
    lifecycle: tokio::sync::Mutex<()>,
    id_gen: G,
}

impl<G> RouterShared<G> {
    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Central registry and dispatch engine.
///
/// Cloning yields another handle to the same router. Adapters reach it
/// through a [`Sink`] bound at registration, which holds only a weak
/// reference.
pub struct Router<G: IdGen = UuidIdGen> {
    shared: Arc<RouterShared<G>>,
}

impl Router<UuidIdGen> {
    pub fn new() -> Self {
        Self::with_id_gen(UuidIdGen)
    }
}

impl Default for Router<UuidIdGen> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: IdGen> Clone for Router<G> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<G: IdGen + 'static> Router<G> {
    pub fn with_id_gen(id_gen: G) -> Self {
        Self {
            shared: Arc::new(RouterShared {
                registry: Mutex::new(Registry::default()),
                lifecycle: tokio::sync::Mutex::new(()),
                id_gen,
            }),
        }
    }

    /// Register a subscription, starting its adapter if this is the first
    /// subscription referencing it. Nothing is registered if start fails.
    ///
    /// The subscription row is in place before the adapter starts, so
    /// occurrences produced during `start` are already matched against it.
    pub async fn register(&self, subscription: Subscription) -> Result<SubscriptionId, RouterError> {
        let _lifecycle = self.shared.lifecycle.lock().await;
        let (adapter, conditions, category) = subscription.into_parts();
        let adapter_id = adapter.id().clone();
        let id = SubscriptionId(self.shared.id_gen.next());

        let (first_reference, refs) = {
            let mut registry = self.shared.registry();
            if let Some(slot) = registry.adapters.get(&adapter_id) {
                if !same_adapter(&slot.adapter, &adapter) {
                    return Err(RouterError::AdapterIdConflict(adapter_id));
                }
            }
            let slot = registry
                .adapters
                .entry(adapter_id.clone())
                .or_insert_with(|| AdapterSlot {
                    adapter: Arc::clone(&adapter),
                    refs: 0,
                });
            slot.refs += 1;
            let refs = slot.refs;
            registry
                .subscriptions
                .push(Arc::new(RegisteredSubscription {
                    id: id.clone(),
                    adapter_id: adapter_id.clone(),
                    conditions,
                    category: category.clone(),
                }));
            (refs == 1, refs)
        };

        if first_reference {
            adapter.bind(self.sink_for(&adapter_id));
            if let Err(e) = adapter.start().await {
                tracing::error!(adapter = %adapter_id, error = %e, "adapter failed to start");
                let mut registry = self.shared.registry();
                registry.subscriptions.retain(|s| s.id != id);
                registry.adapters.remove(&adapter_id);
                return Err(RouterError::AdapterStart(e));
            }
        }

        tracing::info!(
            subscription = %id,
            adapter = %adapter_id,
            category = %category,
            adapter_refs = refs,
            "registered subscription"
        );
        Ok(id)
    }

    /// Remove a subscription, stopping its adapter when no other active
    /// subscription shares it
    pub async fn unregister(&self, id: &SubscriptionId) -> Result<(), RouterError> {
        let _lifecycle = self.shared.lifecycle.lock().await;

        let released = {
            let mut registry = self.shared.registry();
            let position = registry
                .subscriptions
                .iter()
                .position(|s| &s.id == id)
                .ok_or_else(|| RouterError::UnknownSubscription(id.clone()))?;
            let entry = registry.subscriptions.remove(position);

            let remaining = match registry.adapters.get_mut(&entry.adapter_id) {
                Some(slot) => {
                    slot.refs = slot.refs.saturating_sub(1);
                    slot.refs
                }
                None => 0,
            };
            if remaining == 0 {
                registry
                    .adapters
                    .remove(&entry.adapter_id)
                    .map(|slot| slot.adapter)
            } else {
                None
            }
        };

        tracing::info!(subscription = %id, "unregistered subscription");

        if let Some(adapter) = released {
            if let Err(e) = adapter.stop().await {
                tracing::error!(adapter = %adapter.id(), error = %e, "adapter failed to stop");
                return Err(RouterError::AdapterStop(e));
            }
        }
        Ok(())
    }

    /// Register a listener for a category; listeners run in registration order
    pub fn add_listener(&self, category: impl Into<String>, listener: Arc<dyn Listener>) {
        let category = category.into();
        let mut registry = self.shared.registry();
        let listeners = registry.listeners.entry(category.clone()).or_default();
        listeners.push(listener);
        tracing::debug!(category = %category, count = listeners.len(), "added listener");
    }

    /// Remove the first registration of this exact listener. Returns whether
    /// one was removed.
    pub fn remove_listener(&self, category: &str, listener: &Arc<dyn Listener>) -> bool {
        let mut registry = self.shared.registry();
        let Some(listeners) = registry.listeners.get_mut(category) else {
            return false;
        };
        let Some(position) = listeners.iter().position(|l| same_listener(l, listener)) else {
            return false;
        };
        listeners.remove(position);
        if listeners.is_empty() {
            registry.listeners.remove(category);
        }
        tracing::debug!(category, "removed listener");
        true
    }

    /// Match an occurrence from `source` and fan it out to listeners
    pub async fn dispatch(&self, source: &AdapterId, occurrence: Occurrence) -> DispatchReport {
        self.shared.dispatch(source, occurrence).await
    }

    /// Stop every adapter referenced by an active subscription, then clear
    /// the registry. Every adapter is attempted; the first failure is returned.
    pub async fn stop_all(&self) -> Result<(), RouterError> {
        let _lifecycle = self.shared.lifecycle.lock().await;
        tracing::info!("stopping all adapters");

        let adapters: Vec<Arc<dyn SourceAdapter>> = {
            let registry = self.shared.registry();
            let mut seen = HashSet::new();
            registry
                .subscriptions
                .iter()
                .filter(|s| seen.insert(s.adapter_id.clone()))
                .filter_map(|s| registry.adapters.get(&s.adapter_id))
                .map(|slot| Arc::clone(&slot.adapter))
                .collect()
        };

        let mut first_error = None;
        for adapter in adapters {
            if let Err(e) = adapter.stop().await {
                tracing::error!(adapter = %adapter.id(), error = %e, "adapter failed to stop");
                first_error.get_or_insert(e);
            }
        }

        {
            let mut registry = self.shared.registry();
            registry.subscriptions.clear();
            registry.adapters.clear();
        }

        match first_error {
            Some(e) => Err(RouterError::AdapterStop(e)),
            None => Ok(()),
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.shared.registry().subscriptions.len()
    }

    /// Snapshot of registered subscriptions in registration order
    pub fn subscriptions(&self) -> Vec<RegisteredSubscription> {
        self.shared
            .registry()
            .subscriptions
            .iter()
            .map(|s| RegisteredSubscription::clone(s))
            .collect()
    }

    /// Number of active subscriptions referencing an adapter
    pub fn adapter_ref_count(&self, adapter: &AdapterId) -> usize {
        self.shared
            .registry()
            .adapters
            .get(adapter)
            .map_or(0, |slot| slot.refs)
    }

    pub fn listener_count(&self, category: &str) -> usize {
        self.shared
            .registry()
            .listeners
            .get(category)
            .map_or(0, Vec::len)
    }

    fn sink_for(&self, adapter: &AdapterId) -> Sink {
        let handler: Arc<dyn OccurrenceHandler> = self.shared.clone();
        Sink::new(adapter.clone(), Arc::downgrade(&handler))
    }
}

impl<G: IdGen> RouterShared<G> {
    async fn dispatch(&self, source: &AdapterId, occurrence: Occurrence) -> DispatchReport {
        let (subscriptions, listeners) = {
            let registry = self.registry();
            let subscriptions: Vec<Arc<RegisteredSubscription>> = registry
                .subscriptions
                .iter()
                .filter(|s| &s.adapter_id == source)
                .cloned()
                .collect();

            let mut listeners: HashMap<String, Vec<Arc<dyn Listener>>> = HashMap::new();
            for sub in &subscriptions {
                if listeners.contains_key(&sub.category) {
                    continue;
                }
                if let Some(registered) = registry.listeners.get(&sub.category) {
                    listeners.insert(sub.category.clone(), registered.clone());
                }
            }
            (subscriptions, listeners)
        };

        let occurrence = Arc::new(occurrence);
        let mut report = DispatchReport::default();

        for sub in &subscriptions {
            if !sub.check_conditions(&occurrence.payload) {
                continue;
            }
            report.matched += 1;

            let event = FiredEvent::new(sub.id.clone(), sub.category.clone(), Arc::clone(&occurrence));
            for listener in listeners.get(&sub.category).into_iter().flatten() {
                match invoke(listener, &event).await {
                    Ok(()) => report.delivered += 1,
                    Err(e) => {
                        report.failed += 1;
                        tracing::error!(
                            subscription = %sub.id,
                            category = %sub.category,
                            error = %e,
                            "listener failed"
                        );
                    }
                }
            }
        }

        tracing::debug!(
            adapter = %source,
            occurrence = %occurrence.category,
            matched = report.matched,
            delivered = report.delivered,
            failed = report.failed,
            "dispatched"
        );
        report
    }
}

#[async_trait]
impl<G: IdGen + 'static> OccurrenceHandler for RouterShared<G> {
    async fn dispatch(&self, source: &AdapterId, occurrence: Occurrence) -> DispatchReport {
        RouterShared::dispatch(self, source, occurrence).await
    }
}

/// Run one listener on its own task; a panic becomes a listener failure
async fn invoke(listener: &Arc<dyn Listener>, event: &FiredEvent) -> Result<(), ListenerError> {
    let listener = Arc::clone(listener);
    let event = event.clone();
    match tokio::spawn(async move { listener.on_fired(&event).await }).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(ListenerError::new("listener panicked")),
        Err(e) => Err(ListenerError::new(e.to_string())),
    }
}

fn same_adapter(a: &Arc<dyn SourceAdapter>, b: &Arc<dyn SourceAdapter>) -> bool {
    std::ptr::eq(Arc::as_ptr(a).cast::<()>(), Arc::as_ptr(b).cast::<()>())
}

fn same_listener(a: &Arc<dyn Listener>, b: &Arc<dyn Listener>) -> bool {
    std::ptr::eq(Arc::as_ptr(a).cast::<()>(), Arc::as_ptr(b).cast::<()>())
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
