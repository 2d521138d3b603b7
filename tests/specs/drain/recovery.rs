//! Drain recovery specs
//!
//! Verify that crashes and persister outages never lose or duplicate records.

use crate::prelude::*;
use evlog_engine::{preflight, DrainError};
use similar_asserts::assert_eq;

#[tokio::test]
async fn crash_after_persist_before_cursor_recovers_on_restart() {
    let mut wal = Wal::new();
    let receipt = wal.append(&["a", "b", "c"]);
    wal.persister.fail_next(FailureMode::StoreThenFail);
    assert!(wal.engine.run_pass().await.is_err());
    assert_eq!(wal.cursor(), None);

    wal.restart();
    let pass = preflight(wal.engine.as_ref()).await.unwrap();

    assert_eq!(drained(pass), outcome(0, 3));
    assert_eq!(wal.persister.stored_ids(), vec!["a", "b", "c"]);
    assert_eq!(
        wal.cursor(),
        Some(Cursor::new(receipt.segment, receipt.end_offset))
    );
}

#[tokio::test]
async fn outage_holds_cursor_until_store_returns() {
    let wal = Wal::with_batch(2);
    wal.append(&["a", "b"]);
    wal.drain().await;
    let committed = wal.cursor();

    wal.append(&["c", "d", "e"]);
    wal.persister.fail_next(FailureMode::Reject);
    let err = wal.engine.run_pass().await.unwrap_err();
    assert!(matches!(err, DrainError::Persist { .. }));
    assert_eq!(wal.cursor(), committed);

    assert_eq!(drained(wal.drain().await), outcome(3, 0));
    assert_eq!(wal.persister.stored_ids(), vec!["a", "b", "c", "d", "e"]);
}

#[tokio::test]
async fn corrupt_line_is_skipped_once() {
    let wal = Wal::new();
    wal.append(&["a"]);
    let segment = wal.engine.segments().current_segment();
    let path = wal.engine.segments().path_for(&segment);
    let mut bytes = std::fs::read(&path).unwrap();
    bytes.extend_from_slice(b"{truncated\n");
    std::fs::write(&path, &bytes).unwrap();
    wal.append(&["b"]);

    let PassOutcome::Drained(report) = wal.drain().await else {
        panic!("expected a drain pass");
    };

    assert_eq!(report.corrupt, 1);
    assert_eq!(wal.persister.stored_ids(), vec!["a", "b"]);
    let len = std::fs::metadata(&path).unwrap().len();
    assert_eq!(wal.cursor().map(|c| c.offset), Some(len));
    assert_eq!(wal.drain().await, PassOutcome::Idle);
}
