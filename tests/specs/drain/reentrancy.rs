//! Drain reentrancy specs
//!
//! Verify that appends during a pass coalesce into one follow-up pass.

use crate::prelude::*;
use evlog_engine::Appender;
use similar_asserts::assert_eq;

#[tokio::test]
async fn appends_during_a_pass_need_one_follow_up() {
    let wal = Wal::new();
    let handle = evlog_engine::spawn(wal.engine.clone());
    let appender = Appender::new(wal.engine.segments().clone(), handle.trigger());

    wal.persister.pause();
    appender.append(records(&["a"])).await.unwrap();
    wal.persister.wait_for_calls(1).await;

    for id in ["b", "c", "d", "e", "f"] {
        appender.append(records(&[id])).await.unwrap();
    }
    handle.wait_for(|s| s.triggers_received == 6).await.unwrap();
    wal.persister.resume();

    let status = handle
        .wait_for(|s| s.passes == 2 && !s.draining)
        .await
        .unwrap();

    assert_eq!(status.inserted, 6);
    assert_eq!(wal.persister.calls().len(), 2);
    assert_eq!(wal.persister.stored_ids(), vec!["a", "b", "c", "d", "e", "f"]);
    handle.shutdown().await.unwrap();
}
