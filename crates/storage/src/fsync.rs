// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directory fsync
//!
//! Creating, renaming or deleting a file changes the directory entry, which
//! is only durable once the directory itself has been synced.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;

/// Sync a directory so that entry creations, renames and removals survive
/// power loss.
pub fn fsync_dir(dir: &Path) -> io::Result<()> {
    OpenOptions::new().read(true).open(dir)?.sync_all()
}
