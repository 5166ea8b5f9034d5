//! Concrete source specs
//!
//! Verify file-backed and webhook sources deliver through a router.

use crate::prelude::*;
use std::io::Write;
use sw_adapters::{ChangeKind, DirectoryScan, FileTail, WebhookFeed};
use sw_core::PollConfig;

fn fast() -> PollConfig {
    PollConfig::every(Duration::from_millis(20))
}

#[tokio::test]
async fn error_log_lines_fire_with_message_filter() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("service.log");
    std::fs::write(&path, "ERROR: before start\n").unwrap();

    let router = Router::new();
    let tail = FileTail::new(&path, "log").with_level_filter("ERROR");
    let adapter = Arc::new(tail.into_adapter("tail", fast()));
    let (listener, events) = collecting_listener();
    router.add_listener("db_errors", listener);
    router
        .register(
            Subscription::new(adapter, "db_errors").when(Condition::contains("line", "database")),
        )
        .await
        .unwrap();

    let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
    writeln!(file, "INFO: database connected").unwrap();
    writeln!(file, "ERROR: cache miss storm").unwrap();
    writeln!(file, "ERROR: database unreachable").unwrap();
    drop(file);

    eventually(|| !events.lock().unwrap().is_empty()).await;
    tokio::time::sleep(Duration::from_millis(60)).await;
    router.stop_all().await.unwrap();

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].payload()["line"], json!("ERROR: database unreachable"));
    assert_eq!(events[0].payload()["level"], json!("ERROR"));
}

#[tokio::test]
async fn created_files_fire_filesystem_events() {
    let dir = tempfile::tempdir().unwrap();
    let router = Router::new();
    let scan = DirectoryScan::new(dir.path(), "fs")
        .with_patterns(["*.csv"])
        .with_kinds([ChangeKind::Created]);
    let adapter = Arc::new(scan.into_adapter("inbox", fast()));
    let (listener, events) = collecting_listener();
    router.add_listener("new_csv", listener);
    router
        .register(Subscription::new(adapter, "new_csv"))
        .await
        .unwrap();

    std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
    std::fs::write(dir.path().join("report.csv"), "a,b").unwrap();

    eventually(|| !events.lock().unwrap().is_empty()).await;
    router.stop_all().await.unwrap();

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].payload()["event_type"], json!("created"));
    assert!(events[0].payload()["src_path"]
        .as_str()
        .unwrap()
        .ends_with("report.csv"));
}

#[tokio::test]
async fn webhook_rejects_deliveries_once_stopped() {
    let router = Router::new();
    let (adapter, handle) = WebhookFeed::adapter("hook", "webhook");
    let (listener, count) = counting_listener();
    router.add_listener("deploy", listener);
    router
        .register(
            Subscription::new(Arc::new(adapter), "deploy")
                .with_conditions(ConditionSet::equal_all([("event", json!("deploy"))])),
        )
        .await
        .unwrap();

    handle.deliver(json!({ "event": "deploy", "env": "prod" })).unwrap();
    handle.deliver(json!({ "event": "ping" })).unwrap();
    eventually(|| count.load(Ordering::SeqCst) == 1).await;

    router.stop_all().await.unwrap();
    assert!(matches!(
        handle.deliver(json!({ "event": "deploy" })),
        Err(sw_adapters::WebhookError::Stopped)
    ));
}
