// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! On-disk storage for the event write-ahead log: segments and the cursor

pub mod cursor;
pub mod fsync;
pub mod segment;

pub use cursor::CursorStore;
pub use segment::{AppendReceipt, SegmentRead, SegmentRef, SegmentStore};

use evlog_core::SegmentId;
use thiserror::Error;

/// Errors that can occur in segment or cursor storage
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("segment not found: {0}")]
    SegmentMissing(SegmentId),
}
