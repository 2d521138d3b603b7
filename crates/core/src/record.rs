// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Record identity
//!
//! Records are opaque JSON; the only thing the log cares about is that each
//! one carries a string `eventId` the backing store can deduplicate on.

use serde_json::Value;
use thiserror::Error;

/// Field carrying a record's unique identity
pub const EVENT_ID_FIELD: &str = "eventId";

/// Why a log line could not be turned into a record
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("record has no string \"eventId\" field")]
    MissingEventId,
}

/// Get the `eventId` of a record, if it has a string one
pub fn event_id(record: &Value) -> Option<&str> {
    record.get(EVENT_ID_FIELD).and_then(Value::as_str)
}

/// Parse one log line (without its trailing newline) into a record
pub fn parse_record(line: &[u8]) -> Result<Value, RecordError> {
    let record: Value = serde_json::from_slice(line)?;
    if event_id(&record).is_none() {
        return Err(RecordError::MissingEventId);
    }
    Ok(record)
}
