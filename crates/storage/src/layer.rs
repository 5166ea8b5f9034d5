// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tracing` layer that records events into a log store owner

use crate::entry::{LogLevel, OwnerId};
use crate::entry_store::EntryStore;
use crate::log_store::LogStore;
use std::cell::Cell;
use std::fmt::{self, Write};
use std::sync::Arc;
use sw_core::Clock;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

thread_local! {
    static RECORDING: Cell<bool> = const { Cell::new(false) };
}

/// Records every event at or above the owner's level as a log entry.
///
/// Events raised while recording (by a backend, say) are dropped rather
/// than recursing. Backend failures are dropped too; there is nowhere left
/// to report them.
pub struct LogStoreLayer<S: EntryStore, C: Clock> {
    store: Arc<LogStore<S, C>>,
    owner: OwnerId,
}

impl<S: EntryStore, C: Clock> LogStoreLayer<S, C> {
    pub fn new(store: Arc<LogStore<S, C>>, owner: impl Into<OwnerId>) -> Self {
        Self {
            store,
            owner: owner.into(),
        }
    }

    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }
}

impl<Sub, S, C> Layer<Sub> for LogStoreLayer<S, C>
where
    Sub: Subscriber,
    S: EntryStore + 'static,
    C: Clock + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, Sub>) {
        if RECORDING.with(|r| r.replace(true)) {
            return;
        }
        let _recording = RecordingGuard;

        let level = LogLevel::from(*event.metadata().level());
        if level >= self.store.level(&self.owner) {
            let mut visitor = MessageVisitor::default();
            event.record(&mut visitor);
            let _ = self.store.append(&self.owner, level, visitor.finish());
        }
    }
}

/// Clears the thread's recording flag on drop, including during unwinding
struct RecordingGuard;

impl Drop for RecordingGuard {
    fn drop(&mut self) {
        RECORDING.with(|r| r.set(false));
    }
}

/// Collects the `message` field followed by the other fields as `key=value`
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        match (self.message.is_empty(), self.fields.is_empty()) {
            (_, true) => self.message,
            (true, false) => self.fields,
            (false, false) => format!("{} {}", self.message, self.fields),
        }
    }

    fn push_field(&mut self, field: &Field, value: fmt::Arguments<'_>) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{}={}", field.name(), value);
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.push_field(field, format_args!("{value}"));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.push_field(field, format_args!("{value:?}"));
        }
    }
}

#[cfg(test)]
#[path = "layer_tests.rs"]
mod tests;
