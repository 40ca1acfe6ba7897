// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Events produced by the test runner.
//!
//! The runner emits these in a fixed order: run start, then for each suite its tests, and for each
//! test its steps. The session turns each event into sequenced backend work.

use crate::{status::Status, step::Step};
use chrono::{DateTime, FixedOffset, Local};
use rp_bridge_metadata::{Attachment, LogLevel};
use std::sync::Arc;

/// A runner event, stamped with the time it was generated.
#[derive(Clone, Debug)]
pub struct RunnerEvent {
    /// The time at which the event was generated, including the offset from UTC.
    pub timestamp: DateTime<FixedOffset>,

    /// The kind of runner event this is.
    pub kind: RunnerEventKind,
}

impl RunnerEvent {
    /// Creates a new event stamped with the current local time.
    pub fn new(kind: RunnerEventKind) -> Self {
        Self::at(Local::now().fixed_offset(), kind)
    }

    /// Creates a new event with an explicit timestamp.
    pub fn at(timestamp: DateTime<FixedOffset>, kind: RunnerEventKind) -> Self {
        Self { timestamp, kind }
    }
}

/// A suite, as described by the runner.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SuiteInfo {
    /// The suite title.
    pub title: String,
}

impl SuiteInfo {
    /// Creates a new `SuiteInfo`.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

/// A test, as described by the runner.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestInfo {
    /// The test title.
    pub title: String,
}

impl TestInfo {
    /// Creates a new `TestInfo`.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

/// The kind of runner event this is.
///
/// Forms part of [`RunnerEvent`].
#[derive(Clone, Debug)]
pub enum RunnerEventKind {
    /// The run started.
    RunStarted,

    /// A suite started.
    SuiteStarted {
        /// The suite.
        suite: SuiteInfo,
    },

    /// A test started.
    TestStarted {
        /// The test.
        test: TestInfo,
    },

    /// A step started. Its meta-step chain becomes the open chain.
    StepStarted {
        /// The step.
        step: Arc<Step>,
    },

    /// A step finished, with the status the runner recorded for it.
    StepFinished {
        /// The step.
        step: Arc<Step>,

        /// The outcome of the step.
        status: Status,
    },

    /// A step failed.
    StepFailed {
        /// The step.
        step: Arc<Step>,

        /// The failure message.
        error: String,
    },

    /// A step passed.
    StepPassed {
        /// The step.
        step: Arc<Step>,
    },

    /// A test failed.
    TestFailed {
        /// The test.
        test: TestInfo,

        /// The failure message.
        error: String,
    },

    /// A test passed.
    TestPassed {
        /// The test.
        test: TestInfo,
    },

    /// A test finished. Sent after [`Self::TestFailed`] or [`Self::TestPassed`].
    TestFinished {
        /// The test.
        test: TestInfo,
    },

    /// A suite finished.
    SuiteFinished {
        /// The suite.
        suite: SuiteInfo,
    },

    /// The run finished.
    RunFinished,

    /// A log line, and optionally a file, to attach to the innermost open item.
    Log {
        /// The log level.
        level: LogLevel,

        /// The message.
        message: String,

        /// The attached file, if any.
        attachment: Option<Attachment>,
    },
}

impl RunnerEventKind {
    /// Returns a short name for this event, used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            RunnerEventKind::RunStarted => "run-start",
            RunnerEventKind::SuiteStarted { .. } => "suite-start",
            RunnerEventKind::TestStarted { .. } => "test-start",
            RunnerEventKind::StepStarted { .. } => "step-start",
            RunnerEventKind::StepFinished { .. } => "step-end",
            RunnerEventKind::StepFailed { .. } => "step-failed",
            RunnerEventKind::StepPassed { .. } => "step-passed",
            RunnerEventKind::TestFailed { .. } => "test-failed",
            RunnerEventKind::TestPassed { .. } => "test-passed",
            RunnerEventKind::TestFinished { .. } => "test-end",
            RunnerEventKind::SuiteFinished { .. } => "suite-end",
            RunnerEventKind::RunFinished => "run-result",
            RunnerEventKind::Log { .. } => "log",
        }
    }
}
