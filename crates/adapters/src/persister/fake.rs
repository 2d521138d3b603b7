// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake persister for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{BatchPersister, InsertOutcome, PersistError};
use async_trait::async_trait;
use evlog_core::event_id;
use serde_json::Value;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// How an injected failure behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Fail before storing anything
    Reject,
    /// Store the batch, then report failure (a crash after the write)
    StoreThenFail,
}

#[derive(Default)]
struct FakeState {
    stored: Vec<Value>,
    ids: HashSet<String>,
    calls: Vec<Vec<Value>>,
    failures: VecDeque<FailureMode>,
}

/// In-memory persister that deduplicates by `eventId` and records calls.
///
/// Inserts can be paused to hold a drain pass open, and failures can be
/// queued for upcoming calls.
#[derive(Clone)]
pub struct FakePersister {
    state: Arc<Mutex<FakeState>>,
    paused: Arc<watch::Sender<bool>>,
    started: Arc<watch::Sender<usize>>,
}

impl Default for FakePersister {
    fn default() -> Self {
        Self {
            state: Arc::default(),
            paused: Arc::new(watch::channel(false).0),
            started: Arc::new(watch::channel(0).0),
        }
    }
}

impl FakePersister {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Batches passed to `insert`, in call order
    pub fn calls(&self) -> Vec<Vec<Value>> {
        self.lock().calls.clone()
    }

    /// Stored records in insertion order
    pub fn stored(&self) -> Vec<Value> {
        self.lock().stored.clone()
    }

    /// `eventId`s of stored records in insertion order
    pub fn stored_ids(&self) -> Vec<String> {
        self.lock()
            .stored
            .iter()
            .filter_map(|r| event_id(r).map(str::to_string))
            .collect()
    }

    /// Make the next call fail
    pub fn fail_next(&self, mode: FailureMode) {
        self.lock().failures.push_back(mode);
    }

    /// Make inserts wait until [`resume`](Self::resume) is called
    pub fn pause(&self) {
        self.paused.send_replace(true);
    }

    pub fn resume(&self) {
        self.paused.send_replace(false);
    }

    /// Wait until at least `n` insert calls have started
    pub async fn wait_for_calls(&self, n: usize) {
        let mut rx = self.started.subscribe();
        let _ = rx.wait_for(|started| *started >= n).await;
    }

    fn store(state: &mut FakeState, batch: &[Value]) -> InsertOutcome {
        let mut outcome = InsertOutcome::default();
        for record in batch {
            let id = event_id(record).unwrap_or_default().to_string();
            if state.ids.insert(id) {
                state.stored.push(record.clone());
                outcome.inserted += 1;
            } else {
                outcome.duplicates += 1;
            }
        }
        outcome
    }
}

#[async_trait]
impl BatchPersister for FakePersister {
    async fn insert(&self, batch: &[Value]) -> Result<InsertOutcome, PersistError> {
        self.lock().calls.push(batch.to_vec());
        self.started.send_modify(|n| *n += 1);

        let mut paused = self.paused.subscribe();
        let _ = paused.wait_for(|p| !*p).await;

        let mut state = self.lock();
        if let Some(index) = batch.iter().position(|r| event_id(r).is_none()) {
            return Err(PersistError::MissingEventId { index });
        }
        match state.failures.pop_front() {
            Some(FailureMode::Reject) => Err(PersistError::Unavailable("injected failure".into())),
            Some(FailureMode::StoreThenFail) => {
                Self::store(&mut state, batch);
                Err(PersistError::Unavailable("injected failure after store".into()))
            }
            None => Ok(Self::store(&mut state, batch)),
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
