// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by rp-bridge.

use crate::{client::BackendOperation, status::Status};
use camino::Utf8PathBuf;
use std::{io, time::Duration};
use thiserror::Error;

/// An error returned by a [`ReportingClient`](crate::client::ReportingClient) call.
///
/// Backend calls are never retried. The session logs these errors and carries on with the
/// affected item treated as absent.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// The backend rejected the call.
    #[error("backend rejected {operation}: {message}")]
    Rejected {
        /// The operation that was rejected.
        operation: BackendOperation,

        /// The message returned by the backend.
        message: String,
    },

    /// The call did not complete within the configured timeout.
    ///
    /// After a timeout, reporting is marked unavailable for the rest of the run.
    #[error("{operation} did not complete within {timeout:?}")]
    Timeout {
        /// The operation that timed out.
        operation: BackendOperation,

        /// The configured timeout.
        timeout: Duration,
    },

    /// Reporting was marked unavailable by an earlier timeout, so the call was skipped.
    #[error("reporting is unavailable, skipped {operation}")]
    Unavailable {
        /// The operation that was skipped.
        operation: BackendOperation,
    },
}

impl ClientError {
    /// Creates a new `Rejected` error.
    pub fn rejected(operation: BackendOperation, message: impl Into<String>) -> Self {
        Self::Rejected {
            operation,
            message: message.into(),
        }
    }
}

/// A problem encountered while turning runner events into backend calls.
///
/// None of these abort the run: they are logged, collected into the
/// [`RunSummary`](crate::session::RunSummary), and the offending event (or the affected item) is
/// skipped.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// An event arrived before the run was started.
    #[error("{event} received before the run started")]
    RunNotStarted {
        /// The name of the event.
        event: &'static str,
    },

    /// The run was started a second time.
    #[error("run-start received while the run was already in progress")]
    RunAlreadyStarted,

    /// An event arrived after the run finished.
    #[error("{event} received after the run finished")]
    RunFinished {
        /// The name of the event.
        event: &'static str,
    },

    /// An event that needs an open suite arrived while no suite was open.
    #[error("{event} received with no open suite")]
    NoOpenSuite {
        /// The name of the event.
        event: &'static str,
    },

    /// An event that needs an open test arrived while no test was open.
    #[error("{event} received with no open test")]
    NoOpenTest {
        /// The name of the event.
        event: &'static str,
    },

    /// A backend call failed.
    #[error("failed to {action}")]
    Backend {
        /// What the session was trying to do.
        action: String,

        /// The underlying client error.
        #[source]
        error: ClientError,
    },
}

impl SessionError {
    pub(crate) fn backend(action: impl Into<String>, error: ClientError) -> Self {
        Self::Backend {
            action: action.into(),
            error,
        }
    }
}

/// An error returned by the [`Sequencer`](crate::sequencer::Sequencer).
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[non_exhaustive]
pub enum SequencerError {
    /// The worker has exited, so the job could not be queued.
    #[error("sequencer worker has exited, job dropped")]
    Closed,

    /// The worker panicked while running a job.
    #[error("sequencer worker panicked: {message}")]
    WorkerPanic {
        /// The panic message.
        message: String,
    },

    /// The worker task was cancelled, typically because its runtime shut down.
    #[error("sequencer worker was cancelled")]
    WorkerCancelled,
}

/// An error that occurred while loading the bridge configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file at `{path}`")]
    Read {
        /// The path to the config file.
        path: Utf8PathBuf,

        /// The underlying I/O error.
        #[source]
        error: io::Error,
    },

    /// The config file could not be parsed.
    #[error("failed to parse config file at `{path}`")]
    Parse {
        /// The path to the config file.
        path: Utf8PathBuf,

        /// The underlying TOML error.
        #[source]
        error: toml::de::Error,
    },
}

/// Error returned while parsing a [`Status`] value from a string.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error(
    "unrecognized step status: {input}\n(known values: {})",
    Status::variants().join(", "),
)]
pub struct StatusParseError {
    input: String,
}

impl StatusParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}
