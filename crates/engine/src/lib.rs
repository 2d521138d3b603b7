// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Event log drain engine
//!
//! Moves durably appended records from the segment log into a
//! [`BatchPersister`](evlog_adapters::BatchPersister), tracking progress with a
//! single cursor.

mod appender;
mod drain;
mod error;
mod housekeeping;
mod preflight;
mod state;
mod worker;

pub use appender::Appender;
pub use drain::{DrainConfig, DrainEngine, DrainReport, PassOutcome};
pub use error::{AppendError, DrainError};
pub use housekeeping::{HousekeepingConfig, HousekeepingReport};
pub use preflight::preflight;
pub use state::DrainState;
pub use worker::{spawn, DrainHandle, DrainStatus, DrainTrigger, TriggerSource};
