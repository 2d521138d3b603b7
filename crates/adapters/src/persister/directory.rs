// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem-backed persister: one file per `eventId`
//!
//! ```text
//! <root>/<sha256(eventId)>.json  stored record
//! <root>/.tmp-<pid>-<n>          staging file, linked into place
//! ```
//!
//! Each record is staged, fsync'd, then `hard_link`ed to its final name.
//! The link either creates the name atomically or fails with
//! `AlreadyExists`, which is the duplicate signal. A crash can therefore
//! never leave a half-written record under a final name.

use super::{BatchPersister, InsertOutcome, PersistError};
use async_trait::async_trait;
use evlog_core::event_id;
use evlog_storage::fsync::fsync_dir;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Persister storing each record as its own file under a root directory
#[derive(Clone, Debug)]
pub struct DirectoryPersister {
    root: PathBuf,
    staging_counter: Arc<AtomicU64>,
}

impl DirectoryPersister {
    /// Open the store, creating the root directory if needed
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            staging_counter: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load a stored record by `eventId`
    pub fn get(&self, id: &str) -> Result<Option<Value>, PersistError> {
        let path = self.path_for(id);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Number of stored records
    pub fn count(&self) -> Result<usize, PersistError> {
        let mut count = 0;
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "json") {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Fixed-length name, so any id length or byte content maps to a
    /// valid file name inside the root
    fn path_for(&self, id: &str) -> PathBuf {
        self.root.join(file_name(id))
    }

    fn staging_path(&self) -> PathBuf {
        let n = self.staging_counter.fetch_add(1, Ordering::Relaxed);
        self.root
            .join(format!(".tmp-{}-{}", std::process::id(), n))
    }

    fn insert_blocking(&self, batch: &[Value]) -> Result<InsertOutcome, PersistError> {
        // Validate the whole batch before touching the disk
        let mut targets = Vec::with_capacity(batch.len());
        for (index, record) in batch.iter().enumerate() {
            let id = event_id(record).ok_or(PersistError::MissingEventId { index })?;
            targets.push((self.path_for(id), serde_json::to_vec(record)?));
        }

        let mut outcome = InsertOutcome::default();
        for (path, bytes) in targets {
            if self.store_one(&path, &bytes)? {
                outcome.inserted += 1;
            } else {
                outcome.duplicates += 1;
            }
        }

        if outcome.inserted > 0 {
            fsync_dir(&self.root)?;
        }
        Ok(outcome)
    }

    /// Returns `false` if a record with this id was already stored
    fn store_one(&self, path: &Path, bytes: &[u8]) -> Result<bool, PersistError> {
        if path.exists() {
            return Ok(false);
        }

        let staging = self.staging_path();
        let result = write_synced(&staging, bytes).and_then(|()| fs::hard_link(&staging, path));
        let _ = fs::remove_file(&staging);

        match result {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl BatchPersister for DirectoryPersister {
    async fn insert(&self, batch: &[Value]) -> Result<InsertOutcome, PersistError> {
        let this = self.clone();
        let batch = batch.to_vec();
        tokio::task::spawn_blocking(move || this.insert_blocking(&batch))
            .await
            .map_err(|e| PersistError::Unavailable(format!("insert task failed: {}", e)))?
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn file_name(id: &str) -> String {
    format!("{:x}.json", Sha256::digest(id.as_bytes()))
}

#[cfg(test)]
#[path = "directory_tests.rs"]
mod tests;
