// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::persister::{FailureMode, FakePersister};
use serde_json::json;
use std::future::Future;
use std::io::Write;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Run `f` on a fresh runtime with a subscriber writing into a buffer
fn capture_logs<Fut: Future>(f: impl FnOnce() -> Fut) -> (String, Fut::Output) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .without_time()
        .finish();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let output = tracing::subscriber::with_default(subscriber, || runtime.block_on(f()));

    let text = String::from_utf8_lossy(&buffer.0.lock().unwrap()).into_owned();
    (text, output)
}

fn assert_logged(logs: &str, needle: &str) {
    assert!(logs.contains(needle), "missing {:?} in logs:\n{}", needle, logs);
}

#[tokio::test]
async fn traced_persister_passes_through_outcome() {
    let fake = FakePersister::new();
    let traced = TracedPersister::new(fake.clone());

    let outcome = traced
        .insert(&[json!({"eventId": "a"}), json!({"eventId": "a"})])
        .await
        .unwrap();

    assert_eq!(outcome, InsertOutcome { inserted: 1, duplicates: 1 });
    assert_eq!(fake.calls().len(), 1);
}

#[test]
fn traced_insert_logs_span_and_counts() {
    let (logs, result) = capture_logs(|| async {
        let traced = TracedPersister::new(FakePersister::new());
        traced
            .insert(&[json!({"eventId": "a"}), json!({"eventId": "b"})])
            .await
    });

    assert!(result.is_ok(), "insert should succeed: {:?}", result);
    for needle in ["persister.insert", "batch_len=2", "inserted=2", "elapsed_ms"] {
        assert_logged(&logs, needle);
    }
}

#[test]
fn traced_insert_logs_failure() {
    let (logs, result) = capture_logs(|| async {
        let fake = FakePersister::new();
        fake.fail_next(FailureMode::Reject);
        TracedPersister::new(fake)
            .insert(&[json!({"eventId": "a"})])
            .await
    });

    assert!(result.is_err());
    assert_logged(&logs, "insert failed");
    assert_logged(&logs, "injected failure");
}
