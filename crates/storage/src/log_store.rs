// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded, per-owner log with independent storage and display retention
//!
//! Every owner has its own lock. Within it, an append computes the entries
//! its insert pushes past `storage_cutoff`, commits insert and evictions to
//! the backend as one step, and only then updates the in-memory window.
//!
//! Nothing on the append path emits `tracing` events, so the store can sit
//! behind [`LogStoreLayer`](crate::LogStoreLayer).

use crate::entry::{EntryId, LogEntry, LogLevel, OwnerId, Provenance, RetentionPolicy};
use crate::entry_store::{EntryStore, MemoryEntryStore, StoreError};
use minijinja::{context, Environment};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use sw_core::{Clock, SystemClock};
use thiserror::Error;

/// Default rendering of the displayed window
pub const DEFAULT_TEMPLATE: &str = "Log(owner={{ owner }}, level={{ level }}):\n\
{% for entry in entries %}{{ entry.timestamp }} [{{ entry.level }}]: {{ entry.message }}\n{% endfor %}";

#[derive(Debug, Error)]
pub enum LogStoreError {
    /// The backend failed; the entry was not stored
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
    #[error("template error: {0}")]
    Template(String),
}

impl From<minijinja::Error> for LogStoreError {
    fn from(err: minijinja::Error) -> Self {
        LogStoreError::Template(err.to_string())
    }
}

struct OwnerLog {
    loaded: bool,
    entries: VecDeque<LogEntry>,
    policy: RetentionPolicy,
    level: LogLevel,
    next_id: u64,
}

impl OwnerLog {
    fn new(policy: RetentionPolicy) -> Self {
        Self {
            loaded: false,
            entries: VecDeque::new(),
            policy,
            level: LogLevel::default(),
            next_id: 1,
        }
    }

    /// How many of the current entries must go so that `incoming` more fit
    fn excess(&self, incoming: usize) -> usize {
        match self.policy.storage_cutoff {
            Some(cap) => (self.entries.len() + incoming).saturating_sub(cap),
            None => 0,
        }
    }

    fn oldest_ids(&self, count: usize) -> Vec<EntryId> {
        self.entries.iter().take(count).map(|e| e.id).collect()
    }

    fn displayed(&self) -> Vec<LogEntry> {
        let skip = match self.policy.display_cutoff {
            Some(cap) => self.entries.len().saturating_sub(cap),
            None => 0,
        };
        self.entries.iter().skip(skip).cloned().collect()
    }
}

#[derive(Serialize)]
struct RenderedEntry<'a> {
    timestamp: String,
    level: &'static str,
    message: &'a str,
}

/// Bounded log store over an [`EntryStore`] backend
pub struct LogStore<S: EntryStore = MemoryEntryStore, C: Clock = SystemClock> {
    store: S,
    clock: C,
    default_policy: RetentionPolicy,
    template: RwLock<String>,
    owners: RwLock<HashMap<OwnerId, Arc<Mutex<OwnerLog>>>>,
}

impl LogStore<MemoryEntryStore, SystemClock> {
    pub fn in_memory() -> Self {
        Self::new(MemoryEntryStore::new())
    }
}

impl<S: EntryStore> LogStore<S, SystemClock> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: EntryStore, C: Clock> LogStore<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            default_policy: RetentionPolicy::default(),
            template: RwLock::new(DEFAULT_TEMPLATE.to_string()),
            owners: RwLock::new(HashMap::new()),
        }
    }

    /// Policy for owners without an explicit one
    pub fn with_default_policy(mut self, policy: RetentionPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    pub fn backend(&self) -> &S {
        &self.store
    }

    /// Append an entry, evicting the oldest entries beyond `storage_cutoff`.
    ///
    /// On a backend failure nothing changes and the entry is lost.
    pub fn append(
        &self,
        owner: &OwnerId,
        level: LogLevel,
        message: impl Into<String>,
    ) -> Result<LogEntry, LogStoreError> {
        let handle = self.owner(owner);
        let mut log = lock(&handle);
        self.ensure_loaded(owner, &mut log)?;

        let mut timestamp = self.clock.now();
        if let Some(last) = log.entries.back() {
            timestamp = timestamp.max(last.timestamp);
        }
        let entry = LogEntry {
            id: EntryId(log.next_id),
            owner: owner.clone(),
            timestamp,
            level,
            message: message.into(),
            provenance: Provenance::current(),
        };

        // With a zero cap the new entry itself is evicted
        let excess = log.excess(1);
        let keep_new = excess <= log.entries.len();
        let evict = log.oldest_ids(excess);
        let insert = keep_new.then_some(&entry);

        self.store.commit(owner, insert, &evict)?;

        log.next_id += 1;
        log.entries.drain(..evict.len());
        if keep_new {
            log.entries.push_back(entry.clone());
        }
        Ok(entry)
    }

    /// Append a `"LEVEL: message"` line; anything else is logged at INFO whole
    pub fn write(&self, owner: &OwnerId, line: &str) -> Result<LogEntry, LogStoreError> {
        let (level, message) = parse_line(line);
        self.append(owner, level, message)
    }

    /// The displayed window, oldest first
    pub fn read(&self, owner: &OwnerId) -> Result<Vec<LogEntry>, LogStoreError> {
        let handle = self.owner(owner);
        let mut log = lock(&handle);
        self.ensure_loaded(owner, &mut log)?;
        Ok(log.displayed())
    }

    /// Number of stored entries (not limited by `display_cutoff`)
    pub fn len(&self, owner: &OwnerId) -> Result<usize, LogStoreError> {
        let handle = self.owner(owner);
        let mut log = lock(&handle);
        self.ensure_loaded(owner, &mut log)?;
        Ok(log.entries.len())
    }

    /// Render the displayed window through the store's template
    pub fn render(&self, owner: &OwnerId) -> Result<String, LogStoreError> {
        let (entries, level) = {
            let handle = self.owner(owner);
            let mut log = lock(&handle);
            self.ensure_loaded(owner, &mut log)?;
            (log.displayed(), log.level)
        };

        let rendered: Vec<RenderedEntry<'_>> = entries
            .iter()
            .map(|e| RenderedEntry {
                timestamp: e.timestamp.to_rfc3339(),
                level: e.level.as_str(),
                message: &e.message,
            })
            .collect();

        let source = self.template.read().unwrap_or_else(|e| e.into_inner()).clone();
        let env = Environment::new();
        let template = env.template_from_str(&source)?;
        Ok(template.render(context! {
            owner => owner.as_str(),
            level => level.as_str(),
            entries => rendered,
        })?)
    }

    /// Replace the render template; it sees `owner`, `level` and `entries`
    pub fn set_template(&self, source: impl Into<String>) -> Result<(), LogStoreError> {
        let source = source.into();
        Environment::new().template_from_str(&source)?;
        *self.template.write().unwrap_or_else(|e| e.into_inner()) = source;
        Ok(())
    }

    /// Override an owner's policy. A lower `storage_cutoff` evicts at once.
    pub fn set_policy(&self, owner: &OwnerId, policy: RetentionPolicy) -> Result<(), LogStoreError> {
        let handle = self.owner(owner);
        let mut log = lock(&handle);
        self.ensure_loaded(owner, &mut log)?;
        log.policy = policy;
        self.enforce(owner, &mut log)
    }

    pub fn policy(&self, owner: &OwnerId) -> RetentionPolicy {
        lock(&self.owner(owner)).policy
    }

    /// Minimum level the owner reports (shown by `render`)
    pub fn set_level(&self, owner: &OwnerId, level: LogLevel) {
        lock(&self.owner(owner)).level = level;
    }

    pub fn level(&self, owner: &OwnerId) -> LogLevel {
        lock(&self.owner(owner)).level
    }

    /// Owners known to this store so far
    pub fn owners(&self) -> Vec<OwnerId> {
        let mut owners: Vec<OwnerId> = self
            .owners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        owners.sort();
        owners
    }

    fn owner(&self, owner: &OwnerId) -> Arc<Mutex<OwnerLog>> {
        if let Some(log) = self
            .owners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(owner)
        {
            return Arc::clone(log);
        }
        let mut owners = self.owners.write().unwrap_or_else(|e| e.into_inner());
        Arc::clone(
            owners
                .entry(owner.clone())
                .or_insert_with(|| Arc::new(Mutex::new(OwnerLog::new(self.default_policy)))),
        )
    }

    fn ensure_loaded(&self, owner: &OwnerId, log: &mut OwnerLog) -> Result<(), LogStoreError> {
        if log.loaded {
            return Ok(());
        }
        let mut entries = self.store.load(owner)?;
        entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        log.next_id = entries.iter().map(|e| e.id.0 + 1).max().unwrap_or(1);
        log.entries = entries.into();
        log.loaded = true;
        self.enforce(owner, log)
    }

    fn enforce(&self, owner: &OwnerId, log: &mut OwnerLog) -> Result<(), LogStoreError> {
        let excess = log.excess(0);
        if excess == 0 {
            return Ok(());
        }
        let evict = log.oldest_ids(excess);
        self.store.commit(owner, None, &evict)?;
        log.entries.drain(..excess);
        Ok(())
    }
}

fn lock(log: &Mutex<OwnerLog>) -> MutexGuard<'_, OwnerLog> {
    log.lock().unwrap_or_else(|e| e.into_inner())
}

fn parse_line(line: &str) -> (LogLevel, String) {
    if let Some((level, message)) = line.split_once(':') {
        if let Ok(level) = level.trim().parse::<LogLevel>() {
            return (level, message.trim().to_string());
        }
    }
    (LogLevel::Info, line.trim().to_string())
}

#[cfg(test)]
#[path = "log_store_tests.rs"]
mod tests;
