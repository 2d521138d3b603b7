// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Replay cursor: how much of the log has been persisted downstream

use crate::segment::SegmentId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position in the log as `{segment, offset}`.
///
/// Field order matters: the derived `Ord` compares segment first, then
/// offset, which matches log order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cursor {
    pub segment: SegmentId,
    /// Byte offset immediately after the last drained line
    pub offset: u64,
}

impl Cursor {
    pub fn new(segment: SegmentId, offset: u64) -> Self {
        Self { segment, offset }
    }

    /// Cursor at the beginning of a segment
    pub fn start_of(segment: SegmentId) -> Self {
        Self { segment, offset: 0 }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.segment, self.offset)
    }
}
