// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::persister::{BatchPersister, InsertOutcome, PersistError};
use async_trait::async_trait;
use serde_json::Value;
use tracing::Instrument;

/// Wrapper that adds tracing to any BatchPersister
#[derive(Clone)]
pub struct TracedPersister<P> {
    inner: P,
}

impl<P> TracedPersister<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: BatchPersister> BatchPersister for TracedPersister<P> {
    async fn insert(&self, batch: &[Value]) -> Result<InsertOutcome, PersistError> {
        let span = tracing::info_span!("persister.insert", batch_len = batch.len());

        async {
            tracing::debug!("starting");

            let start = std::time::Instant::now();
            let result = self.inner.insert(batch).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(outcome) => tracing::info!(
                    inserted = outcome.inserted,
                    duplicates = outcome.duplicates,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "batch persisted"
                ),
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "insert failed"
                ),
            }

            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
