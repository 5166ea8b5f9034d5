//! Router lifecycle specs
//!
//! Verify adapter reference counting and listener ordering across the
//! public API.

use crate::prelude::*;
use sw_adapters::{AdapterCall, FakeAdapter};
use sw_core::{AdapterState, RouterError};

#[tokio::test]
async fn shared_adapter_lives_until_last_subscription_leaves() {
    let router = Router::new();
    let adapter = Arc::new(FakeAdapter::new("shared"));

    let first = router
        .register(Subscription::new(adapter.clone(), "a"))
        .await
        .unwrap();
    let second = router
        .register(Subscription::new(adapter.clone(), "b"))
        .await
        .unwrap();
    assert_eq!(adapter.start_count(), 1);

    router.unregister(&first).await.unwrap();
    assert_eq!(adapter.state(), AdapterState::Running);

    router.unregister(&second).await.unwrap();
    assert_eq!(adapter.state(), AdapterState::Stopped);
    assert_eq!(
        adapter.calls(),
        vec![AdapterCall::Bind, AdapterCall::Start, AdapterCall::Stop]
    );
}

#[tokio::test]
async fn start_failure_surfaces_to_caller() {
    let router = Router::new();
    let adapter = Arc::new(FakeAdapter::new("broken"));
    adapter.set_fail_start(Some("credentials rejected"));

    let err = router
        .register(Subscription::new(adapter.clone(), "a"))
        .await
        .unwrap_err();
    assert!(matches!(err, RouterError::AdapterStart(_)));
    assert_eq!(router.subscription_count(), 0);
}

#[tokio::test]
async fn listeners_fire_in_registration_order_every_time() {
    let router = Router::new();
    let adapter = Arc::new(FakeAdapter::new("src"));
    let order = Arc::new(Mutex::new(Vec::new()));
    for name in ["first", "second", "third"] {
        let order = Arc::clone(&order);
        router.add_listener(
            "evt",
            listener_fn(move |_| {
                order.lock().unwrap().push(name);
                Ok(())
            }),
        );
    }
    router
        .register(Subscription::new(adapter.clone(), "evt"))
        .await
        .unwrap();

    adapter.emit_json(json!({})).await.unwrap();
    adapter.emit_json(json!({})).await.unwrap();

    assert_eq!(
        *order.lock().unwrap(),
        vec!["first", "second", "third", "first", "second", "third"]
    );
}
