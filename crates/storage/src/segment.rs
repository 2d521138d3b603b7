// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Day-partitioned, append-only segment files
//!
//! ```text
//! <wal-dir>/events-20250130.jsonl   immutable (older than today)
//! <wal-dir>/events-20250131.jsonl   today's segment, appended to
//! <wal-dir>/cursor.json             owned by CursorStore, ignored here
//! ```
//!
//! Every line is one JSON record. Bytes are never rewritten; readers track
//! their position as a byte offset into a segment.

use crate::fsync::fsync_dir;
use crate::StorageError;
use chrono::{DateTime, Duration, Utc};
use evlog_core::{Clock, SegmentId, SystemClock};
use serde_json::Value;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;
use tracing::{debug, info, warn};

const BYTES_PER_MB: u64 = 1024 * 1024;

// Chunk size for scanning backwards to the last newline
const TAIL_CHUNK: usize = 8 * 1024;

/// A segment file as found on disk
#[derive(Debug, Clone)]
pub struct SegmentRef {
    pub id: SegmentId,
    pub path: PathBuf,
    /// Size in bytes at the time of listing
    pub len: u64,
    pub modified: Option<SystemTime>,
}

/// Where an append landed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendReceipt {
    pub segment: SegmentId,
    /// Offset of the first appended byte
    pub start_offset: u64,
    /// Offset immediately after the last appended line
    pub end_offset: u64,
    pub records: usize,
}

/// Result of reading a run of lines from a segment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentRead {
    /// Raw lines without their trailing newline
    pub lines: Vec<Vec<u8>>,
    /// Offset immediately after the last consumed line
    pub next_offset: u64,
    /// No complete line remains after `next_offset`
    pub reached_end: bool,
}

/// Append-only store of day-partitioned segments
#[derive(Clone)]
pub struct SegmentStore<C = SystemClock> {
    dir: PathBuf,
    clock: C,
    // Serializes in-process appenders so one batch is one contiguous write
    append_lock: Arc<Mutex<()>>,
}

impl<C: Clock> SegmentStore<C> {
    /// Open the store, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>, clock: C) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            clock,
            append_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Segment that appends go to right now
    pub fn current_segment(&self) -> SegmentId {
        SegmentId::for_day(self.clock.today())
    }

    pub fn path_for(&self, segment: &SegmentId) -> PathBuf {
        self.dir.join(segment.as_str())
    }

    /// Durably append a batch of records to today's segment.
    ///
    /// All records are serialized up front and written with a single
    /// `write_all`, followed by `fsync`. Returning `Ok` means the batch is on
    /// disk.
    ///
    /// A fragment left at the end of the segment by a crash or a failed write
    /// is truncated first, so the batch always starts on a line boundary.
    pub fn append(&self, records: &[Value]) -> Result<AppendReceipt, StorageError> {
        let segment = self.current_segment();
        if records.is_empty() {
            return Ok(AppendReceipt {
                segment,
                start_offset: 0,
                end_offset: 0,
                records: 0,
            });
        }

        let mut buf = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buf, record)?;
            buf.push(b'\n');
        }

        let _guard = self.append_lock.lock().unwrap_or_else(|e| e.into_inner());

        let path = self.path_for(&segment);
        let created = !path.exists();
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;
        let torn = truncate_torn_tail(&mut file)?;
        if torn > 0 {
            warn!(segment = %segment, bytes = torn, "truncated unterminated tail before append");
        }
        file.write_all(&buf)?;
        file.sync_all()?;

        // A new segment's directory entry must be durable too
        if created {
            fsync_dir(&self.dir)?;
            info!(segment = %segment, "started new segment");
        }

        let end_offset = file.metadata()?.len();
        let receipt = AppendReceipt {
            segment,
            start_offset: end_offset - buf.len() as u64,
            end_offset,
            records: records.len(),
        };
        debug!(
            segment = %receipt.segment,
            records = receipt.records,
            end_offset = receipt.end_offset,
            "appended"
        );
        Ok(receipt)
    }

    /// All segments on disk, oldest first. Files that don't follow the
    /// segment naming convention are ignored.
    pub fn list_segments(&self) -> Result<Vec<SegmentRef>, StorageError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut segments = Vec::new();
        for entry in entries {
            let entry = entry?;
            let Some(id) = entry.file_name().to_str().and_then(SegmentId::parse) else {
                continue;
            };
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            segments.push(SegmentRef {
                id,
                path: entry.path(),
                len: metadata.len(),
                modified: metadata.modified().ok(),
            });
        }

        segments.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(segments)
    }

    /// Read up to `max_lines` complete lines starting at `offset`.
    ///
    /// `next_offset` is computed from the bytes actually consumed. A trailing
    /// fragment without a newline is left unread (it may be a write still in
    /// flight, or torn by a crash) and is reported as end-of-segment.
    pub fn read_from(
        &self,
        segment: &SegmentId,
        offset: u64,
        max_lines: usize,
    ) -> Result<SegmentRead, StorageError> {
        let path = self.path_for(segment);
        let mut file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::SegmentMissing(segment.clone()))
            }
            Err(e) => return Err(e.into()),
        };
        file.seek(SeekFrom::Start(offset))?;
        let mut reader = BufReader::new(file);

        let mut read = SegmentRead {
            lines: Vec::new(),
            next_offset: offset,
            reached_end: false,
        };

        while read.lines.len() < max_lines {
            let mut line = Vec::new();
            let n = reader.read_until(b'\n', &mut line)?;
            if n == 0 || line.last() != Some(&b'\n') {
                read.reached_end = true;
                return Ok(read);
            }

            read.next_offset += n as u64;
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            read.lines.push(line);
        }

        // Read a full batch; peek for a complete line after it
        read.reached_end = !has_newline_after(&mut reader)?;
        Ok(read)
    }

    /// Delete segments whose modification time is older than `days`.
    ///
    /// Today's segment is never removed, nor is any segment at or after
    /// `floor` (the segment the drain cursor points into). Failures are
    /// logged and skipped. Returns how many segments were removed.
    pub fn prune_older_than(&self, days: u32, floor: Option<&SegmentId>) -> usize {
        let segments = match self.list_segments() {
            Ok(segments) => segments,
            Err(e) => {
                warn!(error = %e, "failed to list segments for pruning");
                return 0;
            }
        };

        let cutoff = self.clock.now() - Duration::days(i64::from(days));
        let today = self.current_segment();
        let mut removed = 0;

        for segment in segments {
            if segment.id >= today || floor.is_some_and(|f| segment.id >= *f) {
                continue;
            }
            let Some(modified) = segment.modified else {
                continue;
            };
            if DateTime::<Utc>::from(modified) >= cutoff {
                continue;
            }

            match fs::remove_file(&segment.path) {
                Ok(()) => {
                    info!(segment = %segment.id, days, "pruned segment");
                    removed += 1;
                }
                Err(e) => warn!(segment = %segment.id, error = %e, "failed to prune segment"),
            }
        }

        if removed > 0 {
            if let Err(e) = fsync_dir(&self.dir) {
                warn!(error = %e, "failed to sync WAL directory after pruning");
            }
        }
        removed
    }

    /// Warn if today's segment has grown past `max_mb`. Zero disables the
    /// check. Returns whether the threshold was exceeded.
    pub fn warn_if_oversized(&self, max_mb: u64) -> bool {
        if max_mb == 0 {
            return false;
        }

        let segment = self.current_segment();
        let len = match fs::metadata(self.path_for(&segment)) {
            Ok(metadata) => metadata.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return false,
            Err(e) => {
                warn!(segment = %segment, error = %e, "failed to stat segment");
                return false;
            }
        };

        let limit = max_mb.saturating_mul(BYTES_PER_MB);
        if len > limit {
            warn!(
                segment = %segment,
                size_mb = len / BYTES_PER_MB,
                max_mb,
                "segment exceeds advisory size"
            );
            return true;
        }
        false
    }
}

/// Cut everything after the last newline. Returns the number of bytes
/// removed. Only called under the append lock, so no in-process write can be
/// in flight.
fn truncate_torn_tail(file: &mut File) -> io::Result<u64> {
    let len = file.metadata()?.len();
    let mut end = len;
    let mut chunk = vec![0u8; TAIL_CHUNK];

    let keep = loop {
        if end == 0 {
            break 0;
        }
        let start = end.saturating_sub(TAIL_CHUNK as u64);
        let n = (end - start) as usize;
        file.seek(SeekFrom::Start(start))?;
        file.read_exact(&mut chunk[..n])?;
        if let Some(pos) = chunk[..n].iter().rposition(|&b| b == b'\n') {
            break start + pos as u64 + 1;
        }
        end = start;
    };

    if keep < len {
        file.set_len(keep)?;
        file.sync_all()?;
    }
    Ok(len - keep)
}

/// Scan forward past the buffered chunk for a newline, without consuming
/// anything the caller will need: the reader is dropped right after.
fn has_newline_after(reader: &mut BufReader<File>) -> io::Result<bool> {
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Ok(false);
        }
        if buf.contains(&b'\n') {
            return Ok(true);
        }
        let len = buf.len();
        reader.consume(len);
    }
}

#[cfg(test)]
#[path = "segment_tests.rs"]
mod tests;
