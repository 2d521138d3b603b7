// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Drain scheduling state machine
//!
//! ```text
//! Idle --request--> Draining --complete (no pending)--> Idle
//!                   Draining --request--> Draining + pending
//!                   Draining + pending --complete--> Draining (one follow-up pass)
//! ```
//!
//! Any number of requests during a pass collapse into a single follow-up.

/// In-memory `{draining, pending}` flags. Never persisted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainState {
    draining: bool,
    pending: bool,
}

impl DrainState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for a pass. Returns `true` if the caller should start one now;
    /// otherwise the request is remembered as pending.
    pub fn request(&mut self) -> bool {
        if self.draining {
            self.pending = true;
            false
        } else {
            self.draining = true;
            true
        }
    }

    /// Record that the running pass finished. Returns `true` if exactly one
    /// follow-up pass should start now.
    pub fn complete(&mut self) -> bool {
        if self.pending {
            self.pending = false;
            true
        } else {
            self.draining = false;
            false
        }
    }

    pub fn is_draining(&self) -> bool {
        self.draining
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }
}
