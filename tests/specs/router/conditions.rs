//! Condition matching specs
//!
//! Verify that only occurrences satisfying a subscription's conditions fire.

use crate::prelude::*;
use sw_adapters::FakeAdapter;

#[tokio::test]
async fn equality_conditions_match_payload_subsets() {
    let router = Router::new();
    let adapter = Arc::new(FakeAdapter::new("issues"));
    let (listener, count) = counting_listener();
    router.add_listener("issue_open", listener);
    router
        .register(
            Subscription::new(adapter.clone(), "issue_open")
                .with_conditions(ConditionSet::equal_all([("status", json!("open"))])),
        )
        .await
        .unwrap();

    adapter.emit_json(json!({ "status": "closed" })).await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 0);

    adapter
        .emit_json(json!({ "status": "open", "extra": 1 }))
        .await
        .unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn threshold_conditions_select_readings() {
    let router = Router::new();
    let adapter = Arc::new(FakeAdapter::new("cpu"));
    let (listener, events) = collecting_listener();
    router.add_listener("cpu_hot", listener);
    router
        .register(Subscription::new(adapter.clone(), "cpu_hot").when(Condition::above("usage", 90.0)))
        .await
        .unwrap();

    for usage in [45.0, 91.5, 89.9, 99.0] {
        adapter.emit_json(json!({ "usage": usage })).await.unwrap();
    }

    let fired: Vec<f64> = events
        .lock()
        .unwrap()
        .iter()
        .map(|e| e.payload()["usage"].as_f64().unwrap())
        .collect();
    assert_eq!(fired, vec![91.5, 99.0]);
}

#[tokio::test]
async fn conditions_from_toml_drive_matching() {
    #[derive(serde::Deserialize)]
    struct Rule {
        conditions: ConditionSet,
    }
    let rule: Rule = toml::from_str(
        r#"
[[conditions]]
kind = "equals"
key = "repo"
value = "switchyard"

[[conditions]]
kind = "prefix"
key = "ref"
prefix = "refs/tags/"
"#,
    )
    .unwrap();

    let router = Router::new();
    let adapter = Arc::new(FakeAdapter::new("pushes"));
    let (listener, count) = counting_listener();
    router.add_listener("release", listener);
    router
        .register(Subscription::new(adapter.clone(), "release").with_conditions(rule.conditions))
        .await
        .unwrap();

    adapter
        .emit_json(json!({ "repo": "switchyard", "ref": "refs/heads/main" }))
        .await
        .unwrap();
    adapter
        .emit_json(json!({ "repo": "switchyard", "ref": "refs/tags/v1.0" }))
        .await
        .unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}
