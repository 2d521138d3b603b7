// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use evlog_adapters::{DirectoryPersister, PersistError, TracedPersister};
use evlog_core::SystemClock;
use evlog_engine::{preflight, Appender, DrainEngine, DrainError, DrainHandle, PassOutcome};
use evlog_storage::{CursorStore, SegmentStore, StorageError};
use fs2::FileExt;
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::config::Config;
use crate::server::ServerContext;

/// Lock file inside the WAL directory; one drainer per log
const WAL_LOCK_FILE: &str = "drain.lock";

/// Drain engine with the concrete persister (wrapped with tracing)
pub type DaemonEngine = DrainEngine<TracedPersister<DirectoryPersister>, SystemClock>;

/// Daemon state during operation
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    #[allow(dead_code)]
    wal_lock: File,
    pub listener: UnixListener,
    pub engine: Arc<DaemonEngine>,
    pub drain: DrainHandle,
    /// Shared with connection tasks
    pub context: ServerContext,
}

impl DaemonState {
    /// Shutdown the daemon gracefully
    pub async fn shutdown(self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        // 1. Stop the drain worker; an in-flight pass runs to completion
        let status = self.drain.shutdown().await?;
        info!(
            passes = status.passes,
            failures = status.failures,
            inserted = status.inserted,
            "drain worker stopped"
        );

        // 2. Stop accepting connections
        drop(self.listener);

        // 3. Remove socket file
        if self.config.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.socket_path) {
                warn!("Failed to remove socket file: {}", e);
            }
        }

        // 4. Remove PID file
        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        // 5. Locks are released when lock_file and wal_lock are dropped
        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("WAL directory {0} is locked by another daemon")]
    WalLocked(std::path::PathBuf, #[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(std::path::PathBuf, std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Backing store error: {0}")]
    Persist(#[from] PersistError),

    #[error("Preflight drain failed: {0}")]
    Preflight(#[source] DrainError),

    #[error("Drain error: {0}")]
    Drain(#[from] DrainError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<DaemonState, LifecycleError> {
    match startup_inner(config).await {
        Ok(state) => Ok(state),
        // The pid file belongs to the running daemon
        Err(e @ LifecycleError::LockFailed(_)) => Err(e),
        Err(e) => {
            cleanup_on_failure(config);
            Err(e)
        }
    }
}

/// Inner startup logic - cleanup_on_failure called if this fails
async fn startup_inner(config: &Config) -> Result<DaemonState, LifecycleError> {
    // 1. Create directories
    std::fs::create_dir_all(&config.state_dir)?;
    std::fs::create_dir_all(&config.wal_dir)?;

    // 2. Acquire lock file FIRST - one daemon per state directory
    let mut lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    // One drainer per WAL directory, even across state directories
    let wal_lock_path = config.wal_dir.join(WAL_LOCK_FILE);
    let wal_lock = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&wal_lock_path)?;
    wal_lock
        .try_lock_exclusive()
        .map_err(|e| LifecycleError::WalLocked(config.wal_dir.clone(), e))?;

    // 3. Open stores and the backing store
    let segments = SegmentStore::open(&config.wal_dir, SystemClock)?;
    let cursors = CursorStore::new(&config.wal_dir);
    let persister = TracedPersister::new(DirectoryPersister::open(&config.store_dir)?);
    let engine = Arc::new(DrainEngine::new(
        segments.clone(),
        cursors,
        persister,
        config.drain.clone(),
    ));

    // 4. Preflight BEFORE binding socket (don't accept records over a stuck backlog)
    if let PassOutcome::Drained(report) = preflight(engine.as_ref())
        .await
        .map_err(LifecycleError::Preflight)?
    {
        info!(records = report.records, "recovered backlog from previous run");
    }

    // 5. Start the drain worker
    let drain = evlog_engine::spawn(Arc::clone(&engine));
    let trigger = drain.trigger();
    let context = ServerContext {
        appender: Appender::new(segments, trigger.clone()),
        trigger,
        status: drain.subscribe(),
        start_time: Instant::now(),
        shutdown: Arc::new(Notify::new()),
    };

    // 6. Remove stale socket and bind (LAST - only after all validation passes)
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = match UnixListener::bind(&config.socket_path) {
        Ok(listener) => listener,
        Err(e) => {
            let _ = drain.shutdown().await;
            return Err(LifecycleError::BindFailed(config.socket_path.clone(), e));
        }
    };

    info!(
        wal = %config.wal_dir.display(),
        store = %config.store_dir.display(),
        "Daemon started"
    );

    Ok(DaemonState {
        config: config.clone(),
        lock_file,
        wal_lock,
        listener,
        engine,
        drain,
        context,
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
