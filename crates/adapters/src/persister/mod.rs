// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backing store adapters
//!
//! The drain engine hands batches of records to a [`BatchPersister`]. The
//! persister must be insert-only and idempotent per `eventId`: inserting a
//! record a second time reports it as a duplicate instead of failing or
//! storing a second copy.

mod directory;

pub use directory::DirectoryPersister;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakePersister, FailureMode};

use async_trait::async_trait;
use serde_json::Value;
use std::ops::AddAssign;
use thiserror::Error;

/// Errors from persister operations
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("record {index} in batch has no eventId")]
    MissingEventId { index: usize },
    #[error("backing store unavailable: {0}")]
    Unavailable(String),
}

/// Per-call insert counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertOutcome {
    /// Records that were not stored before this call
    pub inserted: usize,
    /// Records whose `eventId` was already stored
    pub duplicates: usize,
}

impl InsertOutcome {
    pub fn total(&self) -> usize {
        self.inserted + self.duplicates
    }
}

impl AddAssign for InsertOutcome {
    fn add_assign(&mut self, other: Self) {
        self.inserted += other.inserted;
        self.duplicates += other.duplicates;
    }
}

/// Insert-only, idempotent batch store keyed by `eventId`
#[async_trait]
pub trait BatchPersister: Clone + Send + Sync + 'static {
    /// Insert a batch. Any error means the batch as a whole must be treated
    /// as not persisted, even if some records landed.
    async fn insert(&self, batch: &[Value]) -> Result<InsertOutcome, PersistError>;
}
