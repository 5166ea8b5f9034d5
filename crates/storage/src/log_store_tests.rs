// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::{TimeZone, Utc};
use crate::entry_store::JsonlEntryStore;
use sw_core::FakeClock;

fn owner(name: &str) -> OwnerId {
    OwnerId::new(name)
}

fn clocked() -> (LogStore<MemoryEntryStore, FakeClock>, FakeClock) {
    let clock = FakeClock::at(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap());
    (LogStore::with_clock(MemoryEntryStore::new(), clock.clone()), clock)
}

fn levels(entries: &[LogEntry]) -> Vec<LogLevel> {
    entries.iter().map(|e| e.level).collect()
}

fn messages(entries: &[LogEntry]) -> Vec<String> {
    entries.iter().map(|e| e.message.clone()).collect()
}

/// Backend that rejects every write
struct Refusing;

impl EntryStore for Refusing {
    fn load(&self, _owner: &OwnerId) -> Result<Vec<LogEntry>, StoreError> {
        Ok(Vec::new())
    }

    fn commit(&self, _owner: &OwnerId, _insert: Option<&LogEntry>, _evict: &[EntryId]) -> Result<(), StoreError> {
        Err(StoreError::Rejected("disk quota".to_string()))
    }
}

#[test]
fn default_policy_is_one_thousand_each() {
    let store = LogStore::in_memory();
    assert_eq!(
        store.policy(&owner("a")),
        RetentionPolicy::new(Some(1000), Some(1000))
    );
}

#[test]
fn storage_cutoff_keeps_newest_entries() {
    let store = LogStore::in_memory();
    let a = owner("a");
    store
        .set_policy(&a, RetentionPolicy::new(Some(2), None))
        .unwrap();

    for level in [LogLevel::Info, LogLevel::Error, LogLevel::Info, LogLevel::Critical] {
        store.append(&a, level, "x").unwrap();
    }

    let stored = store.read(&a).unwrap();
    assert_eq!(levels(&stored), vec![LogLevel::Info, LogLevel::Critical]);
    assert_eq!(store.backend().entries(&a).len(), 2);
}

#[yare::parameterized(
    under_cap = { 3, 5 },
    at_cap = { 5, 5 },
    over_cap = { 12, 5 },
    cap_of_one = { 4, 1 },
)]
fn stores_min_of_appends_and_cap(appends: usize, cap: usize) {
    let store = LogStore::in_memory().with_default_policy(RetentionPolicy::new(Some(cap), None));
    let a = owner("a");
    for i in 0..appends {
        store.append(&a, LogLevel::Info, format!("m{i}")).unwrap();
        assert!(store.len(&a).unwrap() <= cap);
    }

    let stored = store.read(&a).unwrap();
    let expected: Vec<String> = (appends.saturating_sub(cap)..appends)
        .map(|i| format!("m{i}"))
        .collect();
    assert_eq!(stored.len(), appends.min(cap));
    assert_eq!(messages(&stored), expected);
}

#[test]
fn display_cutoff_truncates_reads_without_deleting() {
    let store = LogStore::in_memory().with_default_policy(RetentionPolicy::new(None, Some(3)));
    let a = owner("a");
    for i in 0..10 {
        store.append(&a, LogLevel::Debug, format!("m{i}")).unwrap();
    }

    assert_eq!(messages(&store.read(&a).unwrap()), vec!["m7", "m8", "m9"]);
    assert_eq!(store.len(&a).unwrap(), 10);

    store.set_policy(&a, RetentionPolicy::unbounded()).unwrap();
    assert_eq!(store.read(&a).unwrap().len(), 10);
}

#[test]
fn lowering_storage_cutoff_evicts_immediately() {
    let store = LogStore::in_memory();
    let a = owner("a");
    for i in 0..5 {
        store.append(&a, LogLevel::Info, format!("m{i}")).unwrap();
    }

    store
        .set_policy(&a, RetentionPolicy::new(Some(2), Some(1000)))
        .unwrap();
    assert_eq!(messages(&store.read(&a).unwrap()), vec!["m3", "m4"]);
    assert_eq!(store.backend().entries(&a).len(), 2);
}

#[test]
fn zero_storage_cutoff_stores_nothing() {
    let store = LogStore::in_memory().with_default_policy(RetentionPolicy::new(Some(0), None));
    let a = owner("a");
    let entry = store.append(&a, LogLevel::Error, "dropped").unwrap();
    assert_eq!(entry.message, "dropped");
    assert!(store.read(&a).unwrap().is_empty());
    assert!(store.backend().entries(&a).is_empty());
}

#[test]
fn owners_are_independent() {
    let store = LogStore::in_memory();
    let a = owner("a");
    let b = owner("b");
    store
        .set_policy(&a, RetentionPolicy::new(Some(1), None))
        .unwrap();

    store.append(&a, LogLevel::Info, "a1").unwrap();
    store.append(&a, LogLevel::Info, "a2").unwrap();
    store.append(&b, LogLevel::Info, "b1").unwrap();
    store.append(&b, LogLevel::Info, "b2").unwrap();

    assert_eq!(messages(&store.read(&a).unwrap()), vec!["a2"]);
    assert_eq!(messages(&store.read(&b).unwrap()), vec!["b1", "b2"]);
    assert_eq!(store.owners(), vec![a, b]);
}

#[test]
fn timestamps_never_go_backwards() {
    let (store, clock) = clocked();
    let a = owner("a");

    let first = store.append(&a, LogLevel::Info, "first").unwrap();
    clock.advance(chrono::Duration::seconds(-30));
    let second = store.append(&a, LogLevel::Info, "second").unwrap();

    assert_eq!(second.timestamp, first.timestamp);
    assert!(second.id > first.id);
    assert_eq!(messages(&store.read(&a).unwrap()), vec!["first", "second"]);
}

#[test]
fn entries_carry_provenance() {
    let store = LogStore::in_memory();
    let entry = std::thread::Builder::new()
        .name("worker-7".to_string())
        .spawn(move || store.append(&owner("a"), LogLevel::Info, "hi").unwrap())
        .unwrap()
        .join()
        .unwrap();

    assert_eq!(entry.provenance.thread_name.as_deref(), Some("worker-7"));
    assert_eq!(entry.provenance.process_id, std::process::id());
    assert!(entry.provenance.thread_id.starts_with("ThreadId("));
}

#[test]
fn backend_failure_loses_entry_and_changes_nothing() {
    let store = LogStore::new(Refusing);
    let a = owner("a");

    let err = store.append(&a, LogLevel::Critical, "lost").unwrap_err();
    assert!(matches!(err, LogStoreError::Storage(StoreError::Rejected(_))));
    assert!(store.read(&a).unwrap().is_empty());
}

#[yare::parameterized(
    error = { "ERROR: disk full", LogLevel::Error, "disk full" },
    critical = { "CRITICAL:meltdown", LogLevel::Critical, "meltdown" },
    padded = { "  WARNING :  hot  ", LogLevel::Warning, "hot" },
    no_level = { "just text", LogLevel::Info, "just text" },
    unknown_level = { "note: remember", LogLevel::Info, "note: remember" },
    lowercase = { "error: quiet", LogLevel::Info, "error: quiet" },
    keeps_later_colons = { "DEBUG: a: b", LogLevel::Debug, "a: b" },
)]
fn write_parses_level_prefix(line: &str, level: LogLevel, message: &str) {
    let store = LogStore::in_memory();
    let entry = store.write(&owner("a"), line).unwrap();
    assert_eq!(entry.level, level);
    assert_eq!(entry.message, message);
}

#[test]
fn render_shows_displayed_window() {
    let (store, clock) = clocked();
    let a = owner("svc");
    store
        .set_policy(&a, RetentionPolicy::new(None, Some(2)))
        .unwrap();
    store.append(&a, LogLevel::Info, "hidden").unwrap();
    clock.advance(chrono::Duration::seconds(1));
    store.append(&a, LogLevel::Warning, "shown").unwrap();
    clock.advance(chrono::Duration::seconds(1));
    store.append(&a, LogLevel::Error, "also shown").unwrap();

    let rendered = store.render(&a).unwrap();
    let lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Log(owner=svc, level=INFO):",
            "2026-03-01T12:00:01+00:00 [WARNING]: shown",
            "2026-03-01T12:00:02+00:00 [ERROR]: also shown",
        ]
    );
}

#[test]
fn render_reflects_owner_level() {
    let store = LogStore::in_memory();
    let a = owner("a");
    store.set_level(&a, LogLevel::Warning);
    assert_eq!(store.level(&a), LogLevel::Warning);
    assert!(store
        .render(&a)
        .unwrap()
        .starts_with("Log(owner=a, level=WARNING):"));
}

#[test]
fn custom_template() {
    let store = LogStore::in_memory();
    let a = owner("a");
    store.append(&a, LogLevel::Info, "one").unwrap();
    store.append(&a, LogLevel::Info, "two").unwrap();

    store
        .set_template("{{ owner }}: {{ entries | length }} entries")
        .unwrap();
    assert_eq!(store.render(&a).unwrap(), "a: 2 entries");

    assert!(matches!(
        store.set_template("{% for %}"),
        Err(LogStoreError::Template(_))
    ));
    assert_eq!(store.render(&a).unwrap(), "a: 2 entries");
}

#[test]
fn reopening_durable_store_restores_window() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.jsonl");
    let a = owner("a");
    let policy = RetentionPolicy::new(Some(3), None);

    {
        let store = LogStore::new(JsonlEntryStore::open(&path).unwrap()).with_default_policy(policy);
        for i in 0..5 {
            store.append(&a, LogLevel::Info, format!("m{i}")).unwrap();
        }
    }

    let store = LogStore::new(JsonlEntryStore::open(&path).unwrap()).with_default_policy(policy);
    assert_eq!(messages(&store.read(&a).unwrap()), vec!["m2", "m3", "m4"]);

    let next = store.append(&a, LogLevel::Info, "m5").unwrap();
    assert_eq!(next.id, EntryId(6));
    assert_eq!(messages(&store.read(&a).unwrap()), vec!["m3", "m4", "m5"]);
}

#[test]
fn loading_over_cap_trims_to_new_policy() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.jsonl");
    let a = owner("a");

    {
        let store = LogStore::new(JsonlEntryStore::open(&path).unwrap());
        for i in 0..4 {
            store.append(&a, LogLevel::Info, format!("m{i}")).unwrap();
        }
    }

    let store = LogStore::new(JsonlEntryStore::open(&path).unwrap())
        .with_default_policy(RetentionPolicy::new(Some(1), None));
    assert_eq!(messages(&store.read(&a).unwrap()), vec!["m3"]);
    assert_eq!(store.backend().load(&a).unwrap().len(), 1);
}

#[test]
fn concurrent_appends_respect_cap() {
    let store = Arc::new(
        LogStore::in_memory().with_default_policy(RetentionPolicy::new(Some(50), None)),
    );
    let a = owner("a");

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = Arc::clone(&store);
            let a = a.clone();
            std::thread::spawn(move || {
                for i in 0..100 {
                    store.append(&a, LogLevel::Info, format!("{t}-{i}")).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let stored = store.read(&a).unwrap();
    assert_eq!(stored.len(), 50);
    assert!(stored.windows(2).all(|w| w[0].id < w[1].id));
    assert!(stored.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    assert_eq!(store.backend().entries(&a).len(), 50);
}

#[test]
fn level_names_round_trip() {
    for level in LogLevel::ALL {
        assert_eq!(level.as_str().parse::<LogLevel>().unwrap(), level);
    }
    assert!("FATAL".parse::<LogLevel>().is_err());
    assert!(LogLevel::Debug < LogLevel::Critical);
}

#[test]
fn retention_policy_from_config() {
    let config = sw_core::RetentionConfig {
        storage_cutoff: None,
        display_cutoff: Some(5),
    };
    assert_eq!(
        RetentionPolicy::from(&config),
        RetentionPolicy::new(None, Some(5))
    );
}
