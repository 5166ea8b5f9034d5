//! Poll-driven adapter specs
//!
//! Verify timed polling end to end through a router.

use crate::prelude::*;
use async_trait::async_trait;
use sw_core::{Occurrence, Payload, PollAdapter, PollConfig, Poller, ProductionError};

/// Poller producing one empty-payload occurrence per poll
struct Ping;

#[async_trait]
impl Poller for Ping {
    async fn poll(&mut self) -> Result<Vec<Occurrence>, ProductionError> {
        Ok(vec![Occurrence::new("ping", Payload::new())])
    }
}

#[tokio::test]
async fn one_second_poll_fires_twice_in_two_and_a_half_seconds() {
    let router = Router::new();
    let adapter = Arc::new(PollAdapter::new(
        "ping",
        PollConfig::every(Duration::from_secs(1)),
        Ping,
    ));
    let (listener, count) = counting_listener();
    router.add_listener("ping", listener);
    router
        .register(Subscription::new(adapter.clone(), "ping"))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(2500)).await;
    router.stop_all().await.unwrap();

    let fired = count.load(Ordering::SeqCst);
    assert!(fired >= 2, "fired {fired} times");

    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(count.load(Ordering::SeqCst), fired);
}

#[tokio::test]
async fn interval_from_config_file() {
    let config = sw_core::Config::from_toml_str("[polling]\nupdate_interval = \"50ms\"\n").unwrap();
    let router = Router::new();
    let adapter = Arc::new(
        sw_adapters::IntervalTicker::new("tick").into_adapter("ticker", config.poll_config()),
    );
    let (listener, count) = counting_listener();
    router.add_listener("tick", listener);
    router
        .register(Subscription::new(adapter, "tick"))
        .await
        .unwrap();

    eventually(|| count.load(Ordering::SeqCst) >= 3).await;
    router.stop_all().await.unwrap();
}
