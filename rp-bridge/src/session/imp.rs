// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::RunSummary;
use crate::{
    client::{ReportingAdapter, ReportingClient},
    config::BridgeConfig,
    errors::{ClientError, SessionError},
    events::{RunnerEvent, RunnerEventKind, SuiteInfo, TestInfo},
    reconcile::{OpenChain, close_chain, reconcile},
    sequencer::Sequenced,
    status::Rollup,
    step::Step,
};
use chrono::{DateTime, FixedOffset};
use rp_bridge_metadata::{Attachment, ItemId, ItemKind, LogLevel};
use tracing::{debug, error, warn};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum RunState {
    NotStarted,
    Running,
    Finished,
}

/// An open suite or test.
#[derive(Debug)]
struct Scope {
    title: String,
    // None if the backend failed to open the item.
    id: Option<ItemId>,
    rollup: Rollup,
}

impl Scope {
    fn new(title: String, id: Option<ItemId>) -> Self {
        Self {
            title,
            id,
            rollup: Rollup::new(),
        }
    }
}

/// Per-run state, owned by the sequencer worker.
pub(super) struct SessionState<C> {
    adapter: ReportingAdapter<C>,
    config: BridgeConfig,
    run: RunState,
    launch: Rollup,
    suite: Option<Scope>,
    test: Option<Scope>,
    chain: OpenChain,
    suites: usize,
    tests: usize,
    failed_tests: usize,
    launch_finished: bool,
    diagnostics: Vec<SessionError>,
}

impl<C: ReportingClient> Sequenced for SessionState<C> {
    type Job = RunnerEvent;

    async fn run(&mut self, event: RunnerEvent) {
        if let Err(error) = self.handle(event).await {
            self.record(error);
        }
    }
}

impl<C: ReportingClient> SessionState<C> {
    pub(super) fn new(adapter: ReportingAdapter<C>, config: BridgeConfig) -> Self {
        Self {
            adapter,
            config,
            run: RunState::NotStarted,
            launch: Rollup::new(),
            suite: None,
            test: None,
            chain: OpenChain::new(),
            suites: 0,
            tests: 0,
            failed_tests: 0,
            launch_finished: false,
            diagnostics: Vec::new(),
        }
    }

    /// Closes whatever is still open and finishes the launch, if the run never finished.
    pub(super) async fn finish_run(&mut self, timestamp: DateTime<FixedOffset>) {
        if self.run != RunState::Running {
            return;
        }
        warn!("run-result was never received, closing open items");
        self.close_dangling_suite(timestamp).await;
        self.finish_launch(timestamp).await;
        self.run = RunState::Finished;
    }

    pub(super) fn into_summary(self) -> RunSummary {
        RunSummary {
            launch_status: self.launch.status(),
            launch_finished: self.launch_finished,
            suites: self.suites,
            tests: self.tests,
            failed_tests: self.failed_tests,
            diagnostics: self.diagnostics,
        }
    }

    async fn handle(&mut self, event: RunnerEvent) -> Result<(), SessionError> {
        let RunnerEvent { timestamp, kind } = event;
        let name = kind.name();
        match (self.run, &kind) {
            (RunState::NotStarted, RunnerEventKind::RunStarted) => {}
            (RunState::NotStarted, _) => return Err(SessionError::RunNotStarted { event: name }),
            (RunState::Running, RunnerEventKind::RunStarted) => {
                return Err(SessionError::RunAlreadyStarted);
            }
            (RunState::Running, _) => {}
            (RunState::Finished, _) => return Err(SessionError::RunFinished { event: name }),
        }

        match kind {
            RunnerEventKind::RunStarted => self.start_run(timestamp).await,
            RunnerEventKind::SuiteStarted { suite } => self.start_suite(suite, timestamp).await,
            RunnerEventKind::TestStarted { test } => self.start_test(test, timestamp).await?,
            RunnerEventKind::StepStarted { step } => {
                let fallback = self.step_fallback_parent(name)?;
                let outcome = reconcile(
                    &mut self.chain,
                    &step.meta_chain(),
                    fallback.as_ref(),
                    &self.adapter,
                    timestamp,
                )
                .await;
                for error in outcome.errors {
                    self.record(error);
                }
            }
            RunnerEventKind::StepFinished { step, status } => {
                let fallback = self.step_fallback_parent(name)?;
                // Failed steps are logged when the failure is reported.
                if self.config.log_steps && !status.is_failed() {
                    let target = self.chain.innermost_id().cloned().or(fallback);
                    self.send_log(target, LogLevel::Info, step.to_string(), timestamp, None)
                        .await;
                }
            }
            RunnerEventKind::StepFailed { step, error } => {
                let fallback = self.step_fallback_parent(name)?;
                self.chain.mark_failed();
                let target = self.chain.innermost_id().cloned().or(fallback);
                self.send_log(
                    target,
                    LogLevel::Error,
                    failed_step_message(&step, &error),
                    timestamp,
                    None,
                )
                .await;
            }
            RunnerEventKind::StepPassed { .. } => {
                self.require_test(name)?;
                self.chain.mark_passed();
            }
            RunnerEventKind::TestFailed { test, error } => {
                self.fail_test(&test, error, timestamp, name).await?
            }
            RunnerEventKind::TestPassed { test } => {
                let scope = self.require_test_mut(name)?;
                scope.rollup.pass();
                debug!("test `{}` passed", test.title);
            }
            RunnerEventKind::TestFinished { .. } => {
                let test = self
                    .test
                    .take()
                    .ok_or(SessionError::NoOpenTest { event: name })?;
                self.close_test(test, timestamp).await;
            }
            RunnerEventKind::SuiteFinished { .. } => {
                if self.suite.is_none() {
                    return Err(SessionError::NoOpenSuite { event: name });
                }
                self.close_dangling_test(timestamp).await;
                if let Some(suite) = self.suite.take() {
                    debug!("suite `{}` finished {}", suite.title, suite.rollup.status());
                    self.close_scope(suite, ItemKind::Suite, timestamp).await;
                }
            }
            RunnerEventKind::RunFinished => {
                self.close_dangling_suite(timestamp).await;
                self.finish_launch(timestamp).await;
                self.run = RunState::Finished;
            }
            RunnerEventKind::Log {
                level,
                message,
                attachment,
            } => {
                if self.suite.is_none() && self.test.is_none() {
                    return Err(SessionError::NoOpenSuite { event: name });
                }
                let target = self
                    .chain
                    .innermost_id()
                    .or_else(|| self.test.as_ref().and_then(|test| test.id.as_ref()))
                    .or_else(|| self.suite.as_ref().and_then(|suite| suite.id.as_ref()))
                    .cloned();
                self.send_log(target, level, message, timestamp, attachment.as_ref())
                    .await;
            }
        }

        Ok(())
    }

    async fn start_run(&mut self, timestamp: DateTime<FixedOffset>) {
        self.run = RunState::Running;
        let descriptor = self.config.launch_descriptor(timestamp);
        if let Err(error) = self.adapter.start_launch(&descriptor).await {
            self.record(SessionError::backend(
                format!("start launch `{}`", descriptor.name),
                error,
            ));
        }
    }

    async fn start_suite(&mut self, suite: SuiteInfo, timestamp: DateTime<FixedOffset>) {
        self.close_dangling_suite(timestamp).await;
        let id = self
            .open_item(&suite.title, ItemKind::Suite, None, timestamp)
            .await;
        self.suite = Some(Scope::new(suite.title, id));
        self.suites += 1;
    }

    async fn start_test(
        &mut self,
        test: TestInfo,
        timestamp: DateTime<FixedOffset>,
    ) -> Result<(), SessionError> {
        let parent = self
            .suite
            .as_ref()
            .ok_or(SessionError::NoOpenSuite {
                event: "test-start",
            })?
            .id
            .clone();
        self.close_dangling_test(timestamp).await;
        let id = self
            .open_item(&test.title, ItemKind::Test, parent, timestamp)
            .await;
        self.test = Some(Scope::new(test.title, id));
        self.tests += 1;
        Ok(())
    }

    async fn fail_test(
        &mut self,
        test: &TestInfo,
        error: String,
        timestamp: DateTime<FixedOffset>,
        name: &'static str,
    ) -> Result<(), SessionError> {
        let scope = self.require_test_mut(name)?;
        scope.rollup.fail();
        let test_id = scope.id.clone();
        let mut suite_id = None;
        if let Some(suite) = &mut self.suite {
            suite.rollup.fail();
            suite_id = suite.id.clone();
        }
        self.launch.fail();
        self.failed_tests += 1;
        debug!("test `{}` failed", test.title);
        let target = test_id.or(suite_id);
        self.send_log(target, LogLevel::Error, error, timestamp, None)
            .await;
        Ok(())
    }

    async fn finish_launch(&mut self, timestamp: DateTime<FixedOffset>) {
        // A launch that failed to start has already been reported.
        if self.adapter.launch_id().is_none() {
            return;
        }
        match self
            .adapter
            .finish_launch(self.launch.status(), timestamp)
            .await
        {
            Ok(()) => self.launch_finished = true,
            Err(error) => self.record(SessionError::backend("finish launch", error)),
        }
    }

    // ---
    // Helper methods
    // ---

    fn require_test(&self, event: &'static str) -> Result<&Scope, SessionError> {
        self.test.as_ref().ok_or(SessionError::NoOpenTest { event })
    }

    /// Returns the parent for the outermost step item: the test, or the suite if the test failed
    /// to open.
    fn step_fallback_parent(&self, event: &'static str) -> Result<Option<ItemId>, SessionError> {
        let test = self.require_test(event)?;
        let suite_id = self.suite.as_ref().and_then(|suite| suite.id.clone());
        Ok(test.id.clone().or(suite_id))
    }

    fn require_test_mut(&mut self, event: &'static str) -> Result<&mut Scope, SessionError> {
        self.test.as_mut().ok_or(SessionError::NoOpenTest { event })
    }

    async fn open_item(
        &mut self,
        name: &str,
        kind: ItemKind,
        parent: Option<ItemId>,
        timestamp: DateTime<FixedOffset>,
    ) -> Option<ItemId> {
        match self
            .adapter
            .open_item(name, kind, parent.as_ref(), timestamp)
            .await
        {
            Ok(id) => Some(id),
            Err(error) => {
                self.record(SessionError::backend(
                    format!("open {kind} `{name}`"),
                    error,
                ));
                None
            }
        }
    }

    async fn close_scope(
        &mut self,
        scope: Scope,
        kind: ItemKind,
        timestamp: DateTime<FixedOffset>,
    ) {
        let Some(id) = &scope.id else {
            return;
        };
        if let Err(error) = self
            .adapter
            .close_item(id, scope.rollup.status(), timestamp)
            .await
        {
            self.record(SessionError::backend(
                format!("close {kind} `{}`", scope.title),
                error,
            ));
        }
    }

    async fn close_test(&mut self, test: Scope, timestamp: DateTime<FixedOffset>) {
        for error in close_chain(&mut self.chain, &self.adapter, timestamp).await {
            self.record(error);
        }
        self.close_scope(test, ItemKind::Test, timestamp).await;
    }

    async fn close_dangling_test(&mut self, timestamp: DateTime<FixedOffset>) {
        if let Some(test) = self.test.take() {
            warn!("test `{}` did not finish, closing it", test.title);
            self.close_test(test, timestamp).await;
        }
    }

    async fn close_dangling_suite(&mut self, timestamp: DateTime<FixedOffset>) {
        self.close_dangling_test(timestamp).await;
        if let Some(suite) = self.suite.take() {
            warn!("suite `{}` did not finish, closing it", suite.title);
            self.close_scope(suite, ItemKind::Suite, timestamp).await;
        }
    }

    async fn send_log(
        &mut self,
        target: Option<ItemId>,
        level: LogLevel,
        message: String,
        timestamp: DateTime<FixedOffset>,
        attachment: Option<&Attachment>,
    ) {
        let Some(id) = target else {
            debug!("no open item to attach log to, dropping: {message}");
            return;
        };
        if let Err(error) = self
            .adapter
            .send_log(&id, level, message, timestamp, attachment)
            .await
        {
            self.record(SessionError::backend(format!("send log to {id}"), error));
        }
    }

    fn record(&mut self, error: SessionError) {
        match &error {
            SessionError::Backend {
                action,
                error: ClientError::Unavailable { .. },
            } => debug!("reporting unavailable, did not {action}"),
            SessionError::Backend {
                action,
                error: source,
            } => error!("failed to {action}: {source}"),
            other => warn!("dropping event: {other}"),
        }
        self.diagnostics.push(error);
    }
}

fn failed_step_message(step: &Step, error: &str) -> String {
    format!("[FAILED STEP] {step} due to {error}")
}
