//! Daemon intake specs
//!
//! Verify the socket protocol end to end against a started daemon.

use crate::prelude::*;
use evlog_daemon::protocol::{call, DEFAULT_TIMEOUT};
use evlog_daemon::{server, startup, Config, Request, Response};
use evlog_engine::HousekeepingConfig;
use similar_asserts::assert_eq;
use std::path::Path;
use std::time::Duration;
use tokio::net::UnixStream;

fn config(root: &Path) -> Config {
    let state_dir = root.join("state");
    Config {
        socket_path: state_dir.join("evlogd.sock"),
        lock_path: state_dir.join("daemon.pid"),
        log_path: state_dir.join("daemon.log"),
        state_dir,
        wal_dir: root.join("wal"),
        store_dir: root.join("store"),
        drain: DrainConfig {
            max_batch: 10,
            backoff: Duration::from_millis(10),
            tail_interval: Duration::ZERO,
        },
        housekeeping: HousekeepingConfig {
            retention_days: 7,
            segment_warn_mb: 0,
        },
    }
}

async fn send(config: &Config, request: Request) -> Response {
    let mut stream = UnixStream::connect(&config.socket_path).await.unwrap();
    call(&mut stream, &request, DEFAULT_TIMEOUT).await.unwrap()
}

#[tokio::test]
async fn appended_records_reach_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let daemon = startup(&config).await.unwrap();

    let ctx = daemon.context.clone();
    let listener = daemon.listener;
    let accept = tokio::spawn(async move {
        for _ in 0..3 {
            let (stream, _) = listener.accept().await.unwrap();
            server::handle_connection(&ctx, stream).await.unwrap();
        }
    });

    assert_eq!(send(&config, Request::Ping).await, Response::Pong);
    let appended = send(
        &config,
        Request::Append {
            events: records(&["a", "b"]),
        },
    )
    .await;
    assert_eq!(appended, Response::Appended { count: 2 });

    daemon.drain.wait_for(|s| s.inserted == 2).await.unwrap();
    let Response::Status {
        passes, last_error, ..
    } = send(&config, Request::Status).await
    else {
        panic!("expected status");
    };
    assert!(passes >= 1);
    assert_eq!(last_error, None);
    accept.await.unwrap();

    let store = evlog_adapters::DirectoryPersister::open(&config.store_dir).unwrap();
    assert_eq!(store.count().unwrap(), 2);
    daemon.drain.shutdown().await.unwrap();
}
