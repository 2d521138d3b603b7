// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Advisory retention and size checks

use crate::drain::{oldest_segment, DrainEngine};
use crate::error::DrainError;
use evlog_adapters::BatchPersister;
use evlog_core::Clock;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct HousekeepingConfig {
    /// Segments older than this many days may be deleted
    pub retention_days: u32,
    /// Warn when today's segment exceeds this size; zero disables
    pub segment_warn_mb: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HousekeepingReport {
    pub pruned: usize,
    pub oversized: bool,
}

impl<P: BatchPersister, C: Clock> DrainEngine<P, C> {
    /// Prune expired segments and check today's segment size.
    ///
    /// Pruning never reaches the segment the cursor points into, so data
    /// that has not been drained is kept regardless of age. Without a usable
    /// cursor the oldest segment is the floor and nothing is removed.
    pub async fn housekeeping(
        &self,
        config: &HousekeepingConfig,
    ) -> Result<HousekeepingReport, DrainError> {
        let segments = self.segments().clone();
        let cursors = self.cursors().clone();
        let config = config.clone();

        let report = tokio::task::spawn_blocking(move || {
            let listed = segments.list_segments()?;
            let floor = match cursors.read() {
                Some(c) if listed.iter().any(|s| s.id == c.segment) => Some(c.segment),
                _ => oldest_segment(&listed).cloned(),
            };

            Ok::<_, DrainError>(HousekeepingReport {
                pruned: segments.prune_older_than(config.retention_days, floor.as_ref()),
                oversized: segments.warn_if_oversized(config.segment_warn_mb),
            })
        })
        .await
        .map_err(|e| DrainError::Task(e.to_string()))??;

        debug!(pruned = report.pruned, oversized = report.oversized, "housekeeping done");
        Ok(report)
    }
}
