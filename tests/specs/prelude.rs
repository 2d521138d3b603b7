//! Shared fixtures for specs

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub use evlog_adapters::{FailureMode, FakePersister, InsertOutcome};
pub use evlog_core::{Cursor, SystemClock};
pub use evlog_engine::{DrainConfig, DrainEngine, PassOutcome};
pub use evlog_storage::{AppendReceipt, CursorStore, SegmentStore};
pub use serde_json::{json, Value};
use tempfile::TempDir;

/// A WAL directory with a drain engine over a fake backing store
pub struct Wal {
    dir: TempDir,
    pub persister: FakePersister,
    pub engine: Arc<DrainEngine<FakePersister>>,
}

impl Wal {
    pub fn new() -> Self {
        Self::with_batch(100)
    }

    pub fn with_batch(max_batch: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let persister = FakePersister::new();
        let engine = Arc::new(engine_over(dir.path(), &persister, max_batch));
        Self {
            dir,
            persister,
            engine,
        }
    }

    /// A fresh engine over the same directory and store, as after a restart
    pub fn restart(&mut self) {
        self.engine = Arc::new(engine_over(
            self.dir.path(),
            &self.persister,
            self.engine.config().max_batch,
        ));
    }

    pub fn append(&self, ids: &[&str]) -> AppendReceipt {
        self.engine.segments().append(&records(ids)).unwrap()
    }

    pub fn cursor(&self) -> Option<Cursor> {
        self.engine.cursors().read()
    }

    pub async fn drain(&self) -> PassOutcome {
        self.engine.run_pass().await.unwrap()
    }
}

fn engine_over(dir: &Path, persister: &FakePersister, max_batch: usize) -> DrainEngine<FakePersister> {
    DrainEngine::new(
        SegmentStore::open(dir, SystemClock).unwrap(),
        CursorStore::new(dir),
        persister.clone(),
        DrainConfig {
            max_batch,
            backoff: Duration::ZERO,
            tail_interval: Duration::ZERO,
        },
    )
}

pub fn records(ids: &[&str]) -> Vec<Value> {
    ids.iter().map(|id| json!({ "eventId": id })).collect()
}

pub fn outcome(inserted: usize, duplicates: usize) -> InsertOutcome {
    InsertOutcome {
        inserted,
        duplicates,
    }
}

/// Insert outcome of a pass that must have drained something
pub fn drained(pass: PassOutcome) -> InsertOutcome {
    match pass {
        PassOutcome::Drained(report) => report.outcome,
        PassOutcome::Idle => panic!("expected a drain pass, got Idle"),
    }
}
