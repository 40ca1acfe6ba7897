// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A single reporting run.
//!
//! A [`ReportSession`] is created when the run starts and consumed when it ends. Producers hand it
//! [`RunnerEvent`]s from any thread; each event is queued on a [`Sequencer`] whose worker owns the
//! open launch, suite, test and step chain, and turns the event into backend calls.
//!
//! Reporting is best-effort. Events that arrive out of order and backend calls that fail are
//! logged and collected into the [`RunSummary`] returned by [`ReportSession::finish`], but never
//! stop the run.

mod imp;

use crate::{
    client::{ReportingAdapter, ReportingClient},
    config::BridgeConfig,
    errors::{SequencerError, SessionError},
    events::{RunnerEvent, RunnerEventKind},
    sequencer::Sequencer,
    status::Status,
};
use chrono::Local;
use imp::SessionState;
use tracing::debug;

/// Reports a single test run.
///
/// Must be created from within a Tokio runtime.
#[derive_where::derive_where(Debug)]
pub struct ReportSession<C: ReportingClient> {
    // None if reporting is disabled.
    sequencer: Option<Sequencer<SessionState<C>>>,
}

impl<C: ReportingClient> ReportSession<C> {
    /// Creates a new session reporting to `client`.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn new(config: &BridgeConfig, client: C) -> Self {
        if !config.enabled {
            debug!("reporting is disabled, events will be ignored");
            return Self { sequencer: None };
        }

        let adapter = ReportingAdapter::new(client, config.call_timeout, config.debug);
        let state = SessionState::new(adapter, config.clone());
        Self {
            sequencer: Some(Sequencer::spawn(state)),
        }
    }

    /// Returns true if events are being reported.
    pub fn is_enabled(&self) -> bool {
        self.sequencer.is_some()
    }

    /// Queues an event. Returns as soon as the event is queued.
    pub fn report_event(&self, event: RunnerEvent) -> Result<(), SequencerError> {
        match &self.sequencer {
            Some(sequencer) => sequencer.enqueue(event),
            None => Ok(()),
        }
    }

    /// Queues an event stamped with the current time.
    pub fn report(&self, kind: RunnerEventKind) -> Result<(), SequencerError> {
        self.report_event(RunnerEvent::new(kind))
    }

    /// Waits until every event queued so far has been reported.
    pub async fn flush(&self) -> Result<(), SequencerError> {
        match &self.sequencer {
            Some(sequencer) => sequencer.flush().await,
            None => Ok(()),
        }
    }

    /// Reports the remaining events and ends the session.
    ///
    /// If the run never finished, the open test, suite and launch are closed first.
    pub async fn finish(self) -> Result<RunSummary, SequencerError> {
        let Some(sequencer) = self.sequencer else {
            return Ok(RunSummary::disabled());
        };
        let mut state = sequencer.finish().await?;
        state.finish_run(Local::now().fixed_offset()).await;
        Ok(state.into_summary())
    }
}

/// The outcome of a reporting session.
#[derive(Clone, Debug)]
pub struct RunSummary {
    /// The aggregate status of the launch.
    pub launch_status: Status,

    /// Whether the backend acknowledged the end of the launch.
    pub launch_finished: bool,

    /// The number of suites started.
    pub suites: usize,

    /// The number of tests started.
    pub tests: usize,

    /// The number of tests that failed.
    pub failed_tests: usize,

    /// Every problem encountered, in the order it was encountered.
    pub diagnostics: Vec<SessionError>,
}

impl RunSummary {
    fn disabled() -> Self {
        Self {
            launch_status: Status::Passed,
            launch_finished: false,
            suites: 0,
            tests: 0,
            failed_tests: 0,
            diagnostics: Vec::new(),
        }
    }

    /// Returns true if every event was reported without problems.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}
