// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::{Arc, Mutex};
use sw_core::Payload;
use tracing_subscriber::fmt::MakeWriter;

/// A writer that captures log output for testing
#[derive(Clone, Default)]
struct CapturedLogs {
    logs: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn contents(&self) -> String {
        let logs = self.logs.lock().unwrap();
        String::from_utf8_lossy(&logs).to_string()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.logs.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run a future with captured tracing output
fn with_tracing<F, Fut>(f: F) -> (String, Fut::Output)
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future,
{
    let logs = CapturedLogs::default();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(logs.clone())
        .with_ansi(false)
        .without_time()
        .finish();

    let result = tracing::subscriber::with_default(subscriber, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f())
    });

    (logs.contents(), result)
}

/// Scripted poller: yields the queued results in order, then nothing
struct Scripted {
    fail_open: bool,
    results: Vec<Result<usize, &'static str>>,
}

#[async_trait]
impl Poller for Scripted {
    async fn open(&mut self) -> Result<(), ProductionError> {
        if self.fail_open {
            return Err(ProductionError::Poll("permission denied".to_string()));
        }
        Ok(())
    }

    async fn poll(&mut self) -> Result<Vec<Occurrence>, ProductionError> {
        if self.results.is_empty() {
            return Ok(Vec::new());
        }
        match self.results.remove(0) {
            Ok(n) => Ok((0..n).map(|_| Occurrence::new("x", Payload::new())).collect()),
            Err(msg) => Err(ProductionError::Poll(msg.to_string())),
        }
    }
}

#[test]
fn open_logs_span_and_timing() {
    let (logs, result) = with_tracing(|| async {
        let mut poller = TracedPoller::new(
            "disk",
            Scripted {
                fail_open: false,
                results: vec![],
            },
        );
        poller.open().await
    });

    assert!(result.is_ok());
    assert!(logs.contains("poller.open"), "logs: {logs}");
    assert!(logs.contains("poller=disk"), "logs: {logs}");
    assert!(logs.contains("elapsed_ms"), "logs: {logs}");
    assert!(logs.contains("opened"), "logs: {logs}");
}

#[test]
fn open_failure_is_logged_as_error() {
    let (logs, result) = with_tracing(|| async {
        let mut poller = TracedPoller::new(
            "disk",
            Scripted {
                fail_open: true,
                results: vec![],
            },
        );
        poller.open().await
    });

    assert!(result.is_err());
    assert!(logs.contains("ERROR"), "logs: {logs}");
    assert!(logs.contains("permission denied"), "logs: {logs}");
}

#[test]
fn poll_results_are_logged_and_passed_through() {
    let (logs, produced) = with_tracing(|| async {
        let mut poller = TracedPoller::new(
            "disk",
            Scripted {
                fail_open: false,
                results: vec![Ok(3), Err("timeout"), Ok(0)],
            },
        );
        let first = poller.poll().await.map(|o| o.len());
        let second = poller.poll().await.map(|o| o.len());
        let third = poller.poll().await.map(|o| o.len());
        (first.ok(), second.is_err(), third.ok())
    });

    assert_eq!(produced, (Some(3), true, Some(0)));
    assert!(logs.contains("produced=3"), "logs: {logs}");
    assert!(logs.contains("n=2"), "logs: {logs}");
    assert!(logs.contains("WARN"), "logs: {logs}");
    assert!(logs.contains("timeout"), "logs: {logs}");
    assert!(logs.contains("nothing new"), "logs: {logs}");
}
