// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for draining and appending

use evlog_adapters::PersistError;
use evlog_core::Cursor;
use evlog_storage::StorageError;
use thiserror::Error;

/// Errors that abort a drain pass
#[derive(Debug, Error)]
pub enum DrainError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("persisting batch at {cursor} failed: {source}")]
    Persist {
        /// Last committed position; the failed batch starts here
        cursor: Cursor,
        #[source]
        source: PersistError,
    },
    #[error("failed to commit cursor {cursor}: {source}")]
    CursorWrite {
        cursor: Cursor,
        #[source]
        source: StorageError,
    },
    #[error("blocking task failed: {0}")]
    Task(String),
}

/// Errors returned to the intake boundary from an append
#[derive(Debug, Error)]
pub enum AppendError {
    /// Nothing was written; the whole request is rejected
    #[error("record {index} has no non-empty string \"eventId\"")]
    MissingEventId { index: usize },
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("blocking task failed: {0}")]
    Task(String),
}
