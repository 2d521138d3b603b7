// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! evlog-core: shared types for the event write-ahead log
//!
//! This crate provides:
//! - Segment identifiers for the day-partitioned log
//! - The replay cursor
//! - Record identity helpers
//! - A clock abstraction for day rollover and retention

pub mod clock;
pub mod cursor;
pub mod record;
pub mod segment;

pub use clock::{Clock, FakeClock, SystemClock};
pub use cursor::Cursor;
pub use record::{event_id, parse_record, RecordError, EVENT_ID_FIELD};
pub use segment::SegmentId;
