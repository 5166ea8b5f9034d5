//! Shared helpers for specs

pub use serde_json::json;
pub use std::sync::atomic::{AtomicUsize, Ordering};
pub use std::sync::{Arc, Mutex};
pub use std::time::Duration;
pub use sw_core::{
    listener_fn, Condition, ConditionSet, FiredEvent, Listener, Router, SourceAdapter,
    Subscription,
};

/// Listener that counts its invocations
pub fn counting_listener() -> (Arc<dyn Listener>, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    let listener = listener_fn(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    (listener, count)
}

/// Listener that keeps every fired event
pub fn collecting_listener() -> (Arc<dyn Listener>, Arc<Mutex<Vec<FiredEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let listener = listener_fn(move |event| {
        sink.lock().unwrap().push(event.clone());
        Ok(())
    });
    (listener, events)
}

/// Poll `done` until it holds or two seconds pass
pub async fn eventually(mut done: impl FnMut() -> bool) {
    for _ in 0..200 {
        if done() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}
