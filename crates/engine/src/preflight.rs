// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup preflight: drain leftovers from a previous run before serving

use crate::drain::{DrainEngine, PassOutcome};
use crate::error::DrainError;
use evlog_adapters::BatchPersister;
use evlog_core::Clock;
use tracing::{error, info};

/// Run one guarded drain pass to completion.
///
/// An error is fatal: the host must not start accepting records while
/// the backlog cannot be persisted.
pub async fn preflight<P: BatchPersister, C: Clock>(
    engine: &DrainEngine<P, C>,
) -> Result<PassOutcome, DrainError> {
    match engine.run_pass().await {
        Ok(PassOutcome::Idle) => {
            info!("preflight: log fully drained");
            Ok(PassOutcome::Idle)
        }
        Ok(PassOutcome::Drained(report)) => {
            info!(
                records = report.records,
                inserted = report.outcome.inserted,
                duplicates = report.outcome.duplicates,
                "preflight: drained backlog"
            );
            Ok(PassOutcome::Drained(report))
        }
        Err(e) => {
            error!(error = %e, "preflight drain failed");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drain::DrainConfig;
    use evlog_adapters::{FailureMode, FakePersister};
    use evlog_core::SystemClock;
    use evlog_storage::{CursorStore, SegmentStore};
    use serde_json::json;
    use std::time::Duration;

    fn engine(dir: &std::path::Path, persister: &FakePersister) -> DrainEngine<FakePersister> {
        DrainEngine::new(
            SegmentStore::open(dir, SystemClock).unwrap(),
            CursorStore::new(dir),
            persister.clone(),
            DrainConfig {
                max_batch: 2,
                backoff: Duration::ZERO,
                tail_interval: Duration::ZERO,
            },
        )
    }

    #[tokio::test]
    async fn clean_log_is_idle() {
        let dir = tempfile::tempdir().unwrap();
        let persister = FakePersister::new();

        let outcome = preflight(&engine(dir.path(), &persister)).await.unwrap();

        assert_eq!(outcome, PassOutcome::Idle);
        assert!(persister.calls().is_empty());
    }

    #[tokio::test]
    async fn backlog_is_fully_drained() {
        let dir = tempfile::tempdir().unwrap();
        let persister = FakePersister::new();
        let engine = engine(dir.path(), &persister);
        let records: Vec<_> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|id| json!({ "eventId": id }))
            .collect();
        engine.segments().append(&records).unwrap();

        let outcome = preflight(&engine).await.unwrap();

        let PassOutcome::Drained(report) = outcome else {
            panic!("expected backlog to drain");
        };
        assert_eq!(report.outcome.inserted, 5);
        assert_eq!(report.batches, 3);
        assert!(!engine.has_unread().await.unwrap());
    }

    #[tokio::test]
    async fn persister_failure_is_returned() {
        let dir = tempfile::tempdir().unwrap();
        let persister = FakePersister::new();
        let engine = engine(dir.path(), &persister);
        engine.segments().append(&[json!({"eventId": "a"})]).unwrap();
        persister.fail_next(FailureMode::Reject);

        let err = preflight(&engine).await.unwrap_err();

        assert!(matches!(err, DrainError::Persist { .. }));
        assert_eq!(engine.cursors().read(), None);
    }
}
