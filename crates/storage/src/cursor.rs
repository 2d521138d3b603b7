// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable replay cursor
//!
//! The cursor lives next to the segments as `cursor.json` and is replaced
//! atomically: write `cursor.json.tmp`, fsync, rename over the old file,
//! fsync the directory.

use crate::fsync::fsync_dir;
use crate::StorageError;
use evlog_core::Cursor;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

pub const CURSOR_FILE: &str = "cursor.json";
const CURSOR_TMP_FILE: &str = "cursor.json.tmp";

/// Single-writer store for the drain cursor
#[derive(Debug, Clone)]
pub struct CursorStore {
    dir: PathBuf,
}

impl CursorStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(CURSOR_FILE)
    }

    /// Last persisted cursor.
    ///
    /// A missing, unreadable or corrupt file yields `None`: the drain then
    /// starts over from the oldest segment, which at worst replays records
    /// the backing store already has.
    pub fn read(&self) -> Option<Cursor> {
        let path = self.path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read cursor, replaying from start");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(cursor) => Some(cursor),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt cursor, replaying from start");
                None
            }
        }
    }

    /// Atomically replace the persisted cursor
    pub fn write(&self, cursor: &Cursor) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;

        let tmp = self.dir.join(CURSOR_TMP_FILE);
        let json = serde_json::to_vec(cursor)?;
        write_synced(&tmp, &json)?;
        fs::rename(&tmp, self.path())?;
        fsync_dir(&self.dir)?;
        Ok(())
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(test)]
#[path = "cursor_tests.rs"]
mod tests;
