// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable write path used by intake

use crate::error::AppendError;
use crate::worker::{DrainTrigger, TriggerSource};
use evlog_core::{event_id, Clock, SystemClock};
use evlog_storage::{AppendReceipt, SegmentStore};
use serde_json::Value;
use tracing::warn;

/// Appends records to the segment store, then nudges the drain worker.
///
/// Every record must carry a non-empty string `eventId`; otherwise nothing is
/// written. `append` only returns once the records are fsynced. The trigger is
/// fire-and-forget and never blocks the caller on draining.
#[derive(Clone)]
pub struct Appender<C = SystemClock> {
    segments: SegmentStore<C>,
    trigger: DrainTrigger,
}

impl<C: Clock> Appender<C> {
    pub fn new(segments: SegmentStore<C>, trigger: DrainTrigger) -> Self {
        Self { segments, trigger }
    }

    pub async fn append(&self, records: Vec<Value>) -> Result<AppendReceipt, AppendError> {
        if let Some(index) = records
            .iter()
            .position(|r| !matches!(event_id(r), Some(id) if !id.is_empty()))
        {
            return Err(AppendError::MissingEventId { index });
        }

        let segments = self.segments.clone();
        let receipt = tokio::task::spawn_blocking(move || segments.append(&records))
            .await
            .map_err(|e| AppendError::Task(e.to_string()))??;

        if receipt.records > 0 && !self.trigger.request(TriggerSource::Append) {
            warn!(segment = %receipt.segment, "drain worker is not running, records wait for the next start");
        }
        Ok(receipt)
    }
}
