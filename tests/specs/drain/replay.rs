//! Drain replay specs
//!
//! Verify the append, drain, dedupe cycle and the no-op guard.

use crate::prelude::*;
use similar_asserts::assert_eq;

#[tokio::test]
async fn append_drain_dedupe_cycle() {
    let wal = Wal::new();

    wal.append(&["a", "b", "c"]);
    assert_eq!(drained(wal.drain().await), outcome(3, 0));
    let after_three = wal.cursor().unwrap();

    assert_eq!(wal.drain().await, PassOutcome::Idle);
    assert_eq!(wal.persister.calls().len(), 1);
    assert_eq!(wal.cursor(), Some(after_three.clone()));

    let receipt = wal.append(&["a", "d"]);
    assert_eq!(drained(wal.drain().await), outcome(1, 1));
    assert_eq!(wal.persister.stored_ids(), vec!["a", "b", "c", "d"]);
    assert_eq!(
        wal.cursor(),
        Some(Cursor::new(receipt.segment, receipt.end_offset))
    );
    assert_eq!(receipt.start_offset, after_three.offset);
}

#[tokio::test]
async fn resetting_the_cursor_replays_as_duplicates() {
    let wal = Wal::with_batch(3);
    wal.append(&["a", "b", "c", "d", "e"]);
    wal.drain().await;

    std::fs::remove_file(wal.engine.cursors().path()).unwrap();

    assert_eq!(drained(wal.drain().await), outcome(0, 5));
    assert_eq!(wal.persister.stored_ids(), vec!["a", "b", "c", "d", "e"]);
}

#[tokio::test]
async fn one_append_reaches_store_in_order() {
    let wal = Wal::with_batch(4);
    let ids: Vec<String> = (0..25).map(|i| format!("evt-{:02}", i)).collect();
    let refs: Vec<&str> = ids.iter().map(String::as_str).collect();

    wal.append(&refs);
    wal.drain().await;

    assert_eq!(wal.persister.stored_ids(), ids);
}
