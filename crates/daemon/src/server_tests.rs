// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use evlog_core::SystemClock;
use evlog_storage::SegmentStore;
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::mpsc;

struct Harness {
    _dir: TempDir,
    segments: SegmentStore,
    triggers: mpsc::Receiver<TriggerSource>,
    status: watch::Sender<DrainStatus>,
    ctx: ServerContext,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let segments = SegmentStore::open(dir.path(), SystemClock).unwrap();
    let (trigger, triggers) = DrainTrigger::channel(8);
    let (status, status_rx) = watch::channel(DrainStatus::default());
    let ctx = ServerContext {
        appender: Appender::new(segments.clone(), trigger.clone()),
        trigger,
        status: status_rx,
        start_time: Instant::now(),
        shutdown: Arc::new(Notify::new()),
    };
    Harness {
        _dir: dir,
        segments,
        triggers,
        status,
        ctx,
    }
}

#[tokio::test]
async fn append_is_durable_before_response() {
    let mut h = harness();

    let response = handle_request(
        &h.ctx,
        Request::Append {
            events: vec![json!({"eventId": "a"}), json!({"eventId": "b"})],
        },
    )
    .await;

    assert_eq!(response, Response::Appended { count: 2 });
    let segment = h.segments.current_segment();
    assert_eq!(h.segments.read_from(&segment, 0, 10).unwrap().lines.len(), 2);
    assert_eq!(h.triggers.try_recv().unwrap(), TriggerSource::Append);
}

#[tokio::test]
async fn append_without_event_ids_is_rejected_before_writing() {
    let mut h = harness();

    let response = handle_request(
        &h.ctx,
        Request::Append {
            events: vec![json!({"kind": "click"}), json!({"eventId": ""})],
        },
    )
    .await;

    let Response::Error { message } = response else {
        panic!("expected an error, got {:?}", response);
    };
    assert!(message.contains("record 0"));
    assert!(h.segments.list_segments().unwrap().is_empty());
    assert!(h.triggers.try_recv().is_err());
}

#[tokio::test]
async fn append_with_empty_event_id_is_rejected() {
    let h = harness();

    let response = handle_request(
        &h.ctx,
        Request::Append {
            events: vec![json!({"eventId": "a"}), json!({"eventId": ""})],
        },
    )
    .await;

    assert!(matches!(response, Response::Error { ref message } if message.contains("record 1")));
    assert!(h.segments.list_segments().unwrap().is_empty());
}

#[tokio::test]
async fn drain_sends_explicit_trigger() {
    let mut h = harness();

    let response = handle_request(&h.ctx, Request::Drain).await;

    assert_eq!(response, Response::DrainRequested);
    assert_eq!(h.triggers.try_recv().unwrap(), TriggerSource::Explicit);
}

#[tokio::test]
async fn drain_without_worker_is_an_error() {
    let h = harness();
    drop(h.triggers);

    let response = handle_request(&h.ctx, Request::Drain).await;

    assert!(matches!(response, Response::Error { .. }));
}

#[tokio::test]
async fn status_reflects_worker() {
    let h = harness();
    h.status.send_modify(|s| {
        s.passes = 4;
        s.draining = true;
        s.last_error = Some("store offline".to_string());
    });

    let response = handle_request(&h.ctx, Request::Status).await;

    match response {
        Response::Status {
            passes,
            draining,
            last_error,
            ..
        } => {
            assert_eq!(passes, 4);
            assert!(draining);
            assert_eq!(last_error.as_deref(), Some("store offline"));
        }
        other => panic!("unexpected response: {:?}", other),
    }
}

#[tokio::test]
async fn shutdown_notifies_main_loop() {
    let h = harness();

    let response = handle_request(&h.ctx, Request::Shutdown).await;

    assert_eq!(response, Response::ShuttingDown);
    // The permit is stored even though nobody was waiting yet
    tokio::time::timeout(std::time::Duration::from_secs(1), h.ctx.shutdown.notified())
        .await
        .unwrap();
}

#[tokio::test]
async fn connection_round_trip() {
    let h = harness();
    let (mut client, server) = UnixStream::pair().unwrap();
    let ctx = h.ctx.clone();
    let task = tokio::spawn(async move { handle_connection(&ctx, server).await });

    let response = protocol::call(&mut client, &Request::Ping, DEFAULT_TIMEOUT)
        .await
        .unwrap();

    assert_eq!(response, Response::Pong);
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn client_closing_early_is_not_an_error() {
    let h = harness();
    let (client, server) = UnixStream::pair().unwrap();
    drop(client);

    handle_connection(&h.ctx, server).await.unwrap();
}
