//! Bounded log store specs
//!
//! Verify storage and display retention through the public API.

use sw_storage::{JsonlEntryStore, LogLevel, LogStore, OwnerId, RetentionPolicy};

#[test]
fn cap_of_two_keeps_the_two_newest_levels() {
    let store = LogStore::in_memory();
    let owner = OwnerId::new("job");
    store
        .set_policy(&owner, RetentionPolicy::new(Some(2), None))
        .unwrap();

    for level in [LogLevel::Info, LogLevel::Error, LogLevel::Info, LogLevel::Critical] {
        store.append(&owner, level, "step").unwrap();
    }

    let levels: Vec<LogLevel> = store
        .read(&owner)
        .unwrap()
        .into_iter()
        .map(|e| e.level)
        .collect();
    assert_eq!(levels, vec![LogLevel::Info, LogLevel::Critical]);
}

#[test]
fn display_cutoff_limits_reads_and_render() {
    let store = LogStore::in_memory().with_default_policy(RetentionPolicy::new(Some(100), Some(2)));
    let owner = OwnerId::new("job");
    for line in ["INFO: one", "WARNING: two", "ERROR: three"] {
        store.write(&owner, line).unwrap();
    }

    let rendered = store.render(&owner).unwrap();
    assert!(rendered.starts_with("Log(owner=job, level=INFO):"));
    assert!(!rendered.contains("one"));
    assert!(rendered.contains("[WARNING]: two"));
    assert!(rendered.contains("[ERROR]: three"));
    assert_eq!(store.len(&owner).unwrap(), 3);
}

#[test]
fn retention_from_config_applies_to_durable_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("entries.jsonl");
    let config = sw_core::Config::from_toml_str("[retention]\nstorage_cutoff = 3\n").unwrap();
    let policy = RetentionPolicy::from(&config.retention);
    let owner = OwnerId::new("svc");

    {
        let store = LogStore::new(JsonlEntryStore::open(&path).unwrap()).with_default_policy(policy);
        for i in 0..10 {
            store.append(&owner, LogLevel::Info, format!("m{i}")).unwrap();
        }
    }

    let store = LogStore::new(JsonlEntryStore::open(&path).unwrap()).with_default_policy(policy);
    let messages: Vec<String> = store
        .read(&owner)
        .unwrap()
        .into_iter()
        .map(|e| e.message)
        .collect();
    assert_eq!(messages, vec!["m7", "m8", "m9"]);
}
