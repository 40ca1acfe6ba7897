// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pass/fail rollup for steps, suites and the launch as a whole.
//!
//! Every scope starts out [`Status::Passed`] and can only degrade. Once a scope has failed, pass
//! events for that scope are ignored until the scope is reset, which only happens when a fresh
//! scope instance begins (for example at suite start).

use crate::errors::StatusParseError;
use rp_bridge_metadata::ItemStatus;
use std::{fmt, str::FromStr};

/// The pass/fail status of a scope, in the runner's vocabulary.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
pub enum Status {
    /// The scope passed, or nothing in it has failed yet.
    Passed,

    /// Something in the scope failed.
    Failed,
}

impl Status {
    /// String representations of all accepted inputs.
    pub fn variants() -> &'static [&'static str] {
        &["success", "passed", "failed"]
    }

    /// Returns true if this status is [`Status::Failed`].
    pub fn is_failed(self) -> bool {
        matches!(self, Status::Failed)
    }

    /// Maps this status to the backend's vocabulary.
    pub fn to_item_status(self) -> ItemStatus {
        match self {
            Status::Passed => ItemStatus::Passed,
            Status::Failed => ItemStatus::Failed,
        }
    }
}

impl FromStr for Status {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Runners report a passing step as "success".
        let val = match s {
            "success" | "passed" => Status::Passed,
            "failed" => Status::Failed,
            other => return Err(StatusParseError::new(other)),
        };
        Ok(val)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Passed => write!(f, "passed"),
            Status::Failed => write!(f, "failed"),
        }
    }
}

impl From<Status> for ItemStatus {
    fn from(status: Status) -> Self {
        status.to_item_status()
    }
}

/// Aggregate status for a single scope instance.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Rollup {
    status: Status,
}

impl Default for Rollup {
    fn default() -> Self {
        Self {
            status: Status::Passed,
        }
    }
}

impl Rollup {
    /// Creates a new rollup in the passed state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current status.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Degrades the scope to failed. Idempotent.
    pub fn fail(&mut self) {
        self.status = Status::Failed;
    }

    /// Records a pass. Never clears an earlier failure.
    pub fn pass(&mut self) {
        if !self.status.is_failed() {
            self.status = Status::Passed;
        }
    }

    /// Records an outcome of either kind.
    pub fn record(&mut self, status: Status) {
        match status {
            Status::Passed => self.pass(),
            Status::Failed => self.fail(),
        }
    }

    /// Starts a fresh scope instance.
    pub fn reset(&mut self) {
        self.status = Status::Passed;
    }
}
