// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Drain engine: move unread log bytes into the backing store
//!
//! A pass resumes at the persisted cursor, walks segments oldest first and
//! for each batch of lines:
//!
//! 1. parses records, skipping and counting corrupt lines
//! 2. inserts the batch through the persister
//! 3. commits the cursor past the batch
//!
//! The cursor is only written after the persister succeeded, so a crash
//! anywhere in between replays the batch on restart. Replays are harmless
//! because the persister is idempotent per `eventId`.

use crate::error::DrainError;
use evlog_adapters::{BatchPersister, InsertOutcome};
use evlog_core::{parse_record, Clock, Cursor, SegmentId, SystemClock};
use evlog_storage::{CursorStore, SegmentRef, SegmentStore, StorageError};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tunables for draining
#[derive(Debug, Clone)]
pub struct DrainConfig {
    /// Maximum lines read (and records inserted) per batch
    pub max_batch: usize,
    /// Wait after a persister failure before the pass gives up
    pub backoff: Duration,
    /// Periodic tail trigger; zero disables it
    pub tail_interval: Duration,
}

/// What a completed pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Calls to the segment reader
    pub reads: usize,
    /// Complete lines consumed, blank and corrupt ones included
    pub lines: usize,
    /// Batches handed to the persister
    pub batches: usize,
    /// Valid records read
    pub records: usize,
    /// Lines skipped as corrupt
    pub corrupt: usize,
    pub outcome: InsertOutcome,
    /// Cursor after the pass
    pub cursor: Option<Cursor>,
}

/// Result of a pass including the no-op guard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// Nothing unread; no reads and no persister calls were made
    Idle,
    Drained(DrainReport),
}

/// Streams segments into a [`BatchPersister`]
pub struct DrainEngine<P, C = SystemClock> {
    segments: SegmentStore<C>,
    cursors: CursorStore,
    persister: P,
    config: DrainConfig,
}

impl<P: BatchPersister, C: Clock> DrainEngine<P, C> {
    pub fn new(
        segments: SegmentStore<C>,
        cursors: CursorStore,
        persister: P,
        config: DrainConfig,
    ) -> Self {
        Self {
            segments,
            cursors,
            persister,
            config,
        }
    }

    pub fn config(&self) -> &DrainConfig {
        &self.config
    }

    pub fn segments(&self) -> &SegmentStore<C> {
        &self.segments
    }

    pub fn cursors(&self) -> &CursorStore {
        &self.cursors
    }

    pub fn persister(&self) -> &P {
        &self.persister
    }

    /// The no-op guard: is there any byte past the cursor, in its own
    /// segment or in a newer non-empty one?
    pub async fn has_unread(&self) -> Result<bool, DrainError> {
        let (segments, cursor) = self.snapshot().await?;
        Ok(unread_after(&segments, cursor.as_ref()))
    }

    /// Guarded pass: returns [`PassOutcome::Idle`] without touching segment
    /// contents or the persister when there is nothing to drain. A pass that
    /// finds only an unterminated fragment is also `Idle`.
    pub async fn run_pass(&self) -> Result<PassOutcome, DrainError> {
        if !self.has_unread().await? {
            debug!("nothing to drain");
            return Ok(PassOutcome::Idle);
        }

        let report = self.drain_pass().await?;
        if report.lines == 0 {
            debug!(reads = report.reads, "no complete lines to drain");
            return Ok(PassOutcome::Idle);
        }
        info!(
            batches = report.batches,
            records = report.records,
            inserted = report.outcome.inserted,
            duplicates = report.outcome.duplicates,
            corrupt = report.corrupt,
            cursor = ?report.cursor.as_ref().map(ToString::to_string),
            "drain pass complete"
        );
        Ok(PassOutcome::Drained(report))
    }

    /// Drain everything from the cursor to the end of the newest segment.
    ///
    /// On a persister failure, waits the configured backoff and returns the
    /// error with the cursor left at its last committed position.
    pub async fn drain_pass(&self) -> Result<DrainReport, DrainError> {
        let (segments, cursor) = self.snapshot().await?;
        let mut report = DrainReport::default();

        let Some(mut position) = resume_point(&segments, cursor) else {
            return Ok(report);
        };
        let max_batch = self.config.max_batch.max(1);
        let first = position.segment.clone();

        for segment in segments.iter().filter(|s| s.id >= first) {
            if segment.id != position.segment {
                position = Cursor::start_of(segment.id.clone());
            }

            loop {
                let read = {
                    let store = self.segments.clone();
                    let id = position.segment.clone();
                    let offset = position.offset;
                    blocking(move || store.read_from(&id, offset, max_batch)).await?
                };
                report.reads += 1;
                report.lines += read.lines.len();

                if read.lines.is_empty() {
                    break;
                }

                let (batch, corrupt) = parse_batch(&read.lines, &position);
                report.records += batch.len();
                report.corrupt += corrupt;

                if !batch.is_empty() {
                    match self.persister.insert(&batch).await {
                        Ok(outcome) => report.outcome += outcome,
                        Err(source) => {
                            warn!(
                                cursor = %position,
                                records = batch.len(),
                                backoff_ms = self.config.backoff.as_millis() as u64,
                                error = %source,
                                "persisting batch failed, holding cursor"
                            );
                            tokio::time::sleep(self.config.backoff).await;
                            return Err(DrainError::Persist {
                                cursor: position,
                                source,
                            });
                        }
                    }
                    report.batches += 1;
                }

                let next = Cursor::new(position.segment.clone(), read.next_offset);
                self.commit(&next).await?;
                position = next;

                if read.reached_end {
                    break;
                }
            }
        }

        report.cursor = Some(position);
        Ok(report)
    }

    async fn commit(&self, cursor: &Cursor) -> Result<(), DrainError> {
        let cursors = self.cursors.clone();
        let next = cursor.clone();
        match tokio::task::spawn_blocking(move || cursors.write(&next)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(DrainError::CursorWrite {
                cursor: cursor.clone(),
                source,
            }),
            Err(e) => Err(DrainError::Task(e.to_string())),
        }
    }

    async fn snapshot(&self) -> Result<(Vec<SegmentRef>, Option<Cursor>), DrainError> {
        let store = self.segments.clone();
        let cursors = self.cursors.clone();
        blocking(move || Ok((store.list_segments()?, cursors.read()))).await
    }
}

/// Where a pass starts: the cursor if its segment still exists, otherwise
/// the start of the oldest segment.
fn resume_point(segments: &[SegmentRef], cursor: Option<Cursor>) -> Option<Cursor> {
    let oldest = segments.first()?;
    match cursor {
        Some(c) if segments.iter().any(|s| s.id == c.segment) => Some(c),
        Some(c) => {
            warn!(
                cursor = %c,
                oldest = %oldest.id,
                "cursor segment is gone, replaying from oldest segment"
            );
            Some(Cursor::start_of(oldest.id.clone()))
        }
        None => Some(Cursor::start_of(oldest.id.clone())),
    }
}

fn unread_after(segments: &[SegmentRef], cursor: Option<&Cursor>) -> bool {
    match cursor.filter(|c| segments.iter().any(|s| s.id == c.segment)) {
        Some(c) => segments.iter().any(|s| {
            (s.id == c.segment && s.len > c.offset) || (s.id > c.segment && s.len > 0)
        }),
        None => segments.iter().any(|s| s.len > 0),
    }
}

/// Parse raw lines into records. Blank lines are ignored; lines that are not
/// JSON objects with an `eventId` are logged and counted as corrupt.
fn parse_batch(lines: &[Vec<u8>], position: &Cursor) -> (Vec<Value>, usize) {
    let mut batch = Vec::with_capacity(lines.len());
    let mut corrupt = 0;

    for (index, line) in lines.iter().enumerate() {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match parse_record(line) {
            Ok(record) => batch.push(record),
            Err(e) => {
                warn!(
                    segment = %position.segment,
                    batch_offset = position.offset,
                    line = index,
                    error = %e,
                    "skipping corrupt record"
                );
                corrupt += 1;
            }
        }
    }

    (batch, corrupt)
}

async fn blocking<T, F>(f: F) -> Result<T, DrainError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StorageError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DrainError::Task(e.to_string()))?
        .map_err(DrainError::from)
}

/// Segment that a cursor-less drain would start from
pub(crate) fn oldest_segment(segments: &[SegmentRef]) -> Option<&SegmentId> {
    segments.first().map(|s| &s.id)
}

#[cfg(test)]
#[path = "drain_tests.rs"]
mod tests;
