// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Day-partitioned segment identifiers
//!
//! A segment is named `events-YYYYMMDD.jsonl`. The fixed-width date makes
//! lexical order equal chronological order, so `SegmentId` derives `Ord`
//! straight from its name.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

const PREFIX: &str = "events-";
const SUFFIX: &str = ".jsonl";
const DATE_FORMAT: &str = "%Y%m%d";

/// Identifier (file name) of a single day's segment
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(String);

impl SegmentId {
    /// Segment for the given UTC calendar day
    pub fn for_day(day: NaiveDate) -> Self {
        Self(format!("{}{}{}", PREFIX, day.format(DATE_FORMAT), SUFFIX))
    }

    /// Parse a file name, returning `None` if it does not follow the
    /// segment naming convention.
    pub fn parse(file_name: &str) -> Option<Self> {
        let digits = file_name.strip_prefix(PREFIX)?.strip_suffix(SUFFIX)?;
        if digits.len() != 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        NaiveDate::parse_from_str(digits, DATE_FORMAT).ok()?;
        Some(Self(file_name.to_string()))
    }

    /// The calendar day this segment covers
    pub fn day(&self) -> Option<NaiveDate> {
        let digits = self.0.strip_prefix(PREFIX)?.strip_suffix(SUFFIX)?;
        NaiveDate::parse_from_str(digits, DATE_FORMAT).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[path = "segment_tests.rs"]
mod tests;
