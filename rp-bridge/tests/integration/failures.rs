// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Misordered events and backend failures.

use crate::fixtures::*;
use pretty_assertions::assert_eq;
use rp_bridge::{
    client::{BackendOperation, RecordedCall, RecordingClient},
    config::BridgeConfig,
    errors::{ClientError, SessionError},
    events::{RunnerEventKind, TestInfo},
    status::Status,
};
use rp_bridge_metadata::{ItemStatus, LogLevel};
use std::time::Duration;

#[tokio::test]
async fn events_without_a_parent_are_dropped() {
    let harness = Harness::new();
    harness.start_test("too early");
    harness.start_run();
    harness.start_test("no suite");
    harness.passing_step(&step_in(&[("a", "x")], "click"));
    harness.send(RunnerEventKind::TestFinished {
        test: TestInfo::new("no suite"),
    });
    harness.end_run();
    let (client, summary) = harness.finish().await;

    let dropped: Vec<_> = summary
        .diagnostics
        .iter()
        .map(|error| match error {
            SessionError::RunNotStarted { event } => format!("run not started: {event}"),
            SessionError::NoOpenSuite { event } => format!("no suite: {event}"),
            SessionError::NoOpenTest { event } => format!("no test: {event}"),
            other => panic!("unexpected diagnostic: {other}"),
        })
        .collect();
    assert_eq!(
        dropped,
        [
            "run not started: test-start",
            "no suite: test-start",
            "no test: step-start",
            "no test: step-passed",
            "no test: step-end",
            "no test: test-end",
        ]
    );

    // Only the launch itself reached the backend.
    assert!(client.items().is_empty());
    assert_eq!(client.launch_status(), Some(ItemStatus::Passed));
}

#[tokio::test]
async fn rejected_meta_step_nests_children_under_nearest_ancestor() {
    let client = RecordingClient::new();
    client.reject_item("I b y");
    let harness = Harness::with_config(BridgeConfig::default(), client);

    harness.start_run();
    harness.start_suite("suite");
    harness.start_test("test");
    harness.passing_step(&step_in(&[("a", "x"), ("b", "y"), ("c", "z")], "click"));
    // Same chain: the rejected entry is not retried.
    harness.passing_step(&step_in(&[("a", "x"), ("b", "y"), ("c", "z")], "type"));
    harness.end_test("test", Status::Passed);
    harness.end_suite("suite");
    harness.end_run();
    let (client, summary) = harness.finish().await;

    let a = client.item_named("I a x").unwrap();
    let c = client.item_named("I c z").unwrap();
    assert_eq!(c.parent, Some(a.id));
    assert!(client.item_named("I b y").is_none());

    assert_eq!(summary.diagnostics.len(), 1, "{:?}", summary.diagnostics);
    assert!(matches!(
        &summary.diagnostics[0],
        SessionError::Backend {
            error: ClientError::Rejected {
                operation: BackendOperation::StartItem,
                ..
            },
            ..
        }
    ));
    assert!(summary.launch_finished);
    assert_well_formed(&client.calls());
}

#[tokio::test]
async fn rejected_test_nests_steps_under_the_suite() {
    let client = RecordingClient::new();
    client.reject_item("test");
    let harness = Harness::with_config(BridgeConfig::default(), client);

    harness.start_run();
    harness.start_suite("suite");
    harness.start_test("test");
    harness.passing_step(&step_in(&[("a", "x")], "click"));
    harness.passing_step(&step_in(&[], "see"));
    harness.end_test("test", Status::Passed);
    harness.end_suite("suite");
    harness.end_run();
    let (client, summary) = harness.finish().await;

    let suite = client.item_named("suite").unwrap();
    let a = client.item_named("I a x").unwrap();
    assert!(client.item_named("test").is_none());
    assert_eq!(a.parent, Some(suite.id.clone()));
    assert_eq!(a.statuses, [ItemStatus::Passed]);

    // With the chain closed, the bare step's log line also goes to the suite.
    assert!(client.calls().contains(&RecordedCall::SendLog {
        id: suite.id,
        level: LogLevel::Info,
        message: "I see 1".to_owned(),
        attachment: None,
    }));

    assert_eq!(summary.diagnostics.len(), 1, "{:?}", summary.diagnostics);
    assert!(matches!(
        &summary.diagnostics[0],
        SessionError::Backend {
            error: ClientError::Rejected {
                operation: BackendOperation::StartItem,
                ..
            },
            ..
        }
    ));
    assert_well_formed(&client.calls());
}

#[tokio::test]
async fn rejected_test_failure_is_logged_to_the_suite() {
    let client = RecordingClient::new();
    client.reject_item("test");
    let harness = Harness::with_config(BridgeConfig::default(), client);

    harness.start_run();
    harness.start_suite("suite");
    harness.start_test("test");
    harness.send(RunnerEventKind::TestFailed {
        test: TestInfo::new("test"),
        error: "assertion failed".to_owned(),
    });
    harness.send(RunnerEventKind::TestFinished {
        test: TestInfo::new("test"),
    });
    harness.end_suite("suite");
    harness.end_run();
    let (client, summary) = harness.finish().await;

    let suite = client.item_named("suite").unwrap();
    assert!(client.calls().contains(&RecordedCall::SendLog {
        id: suite.id,
        level: LogLevel::Error,
        message: "assertion failed".to_owned(),
        attachment: None,
    }));
    assert_eq!(suite.statuses, [ItemStatus::Failed]);
    assert_eq!(summary.failed_tests, 1);
    assert_eq!(client.launch_status(), Some(ItemStatus::Failed));
}

#[tokio::test]
async fn rejected_closes_do_not_stop_the_run() {
    let client = RecordingClient::new();
    client.reject(BackendOperation::FinishItem);
    let harness = Harness::with_config(BridgeConfig::default(), client);

    harness.start_run();
    harness.start_suite("suite");
    harness.start_test("test");
    harness.passing_step(&step_in(&[("a", "x")], "click"));
    harness.end_test("test", Status::Failed);
    harness.end_suite("suite");
    harness.end_run();
    let (client, summary) = harness.finish().await;

    // The step, the test and the suite each failed to close.
    assert_eq!(summary.diagnostics.len(), 3, "{:?}", summary.diagnostics);
    assert!(summary.diagnostics.iter().all(|error| matches!(
        error,
        SessionError::Backend {
            error: ClientError::Rejected {
                operation: BackendOperation::FinishItem,
                ..
            },
            ..
        }
    )));
    assert!(summary.launch_finished);
    assert_eq!(client.launch_status(), Some(ItemStatus::Failed));
}

#[tokio::test]
async fn failed_launch_start_skips_items() {
    let client = RecordingClient::new();
    client.reject(BackendOperation::StartLaunch);
    let harness = Harness::with_config(BridgeConfig::default(), client);

    harness.start_run();
    harness.start_suite("suite");
    harness.start_test("test");
    harness.end_test("test", Status::Passed);
    harness.end_suite("suite");
    harness.end_run();
    let (client, summary) = harness.finish().await;

    assert!(client.calls().is_empty());
    assert!(!summary.launch_finished);
    // The launch failure, then one skipped open each for the suite and the test.
    assert_eq!(summary.diagnostics.len(), 3, "{:?}", summary.diagnostics);
    assert!(matches!(
        &summary.diagnostics[1],
        SessionError::Backend {
            error: ClientError::Unavailable {
                operation: BackendOperation::StartItem
            },
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn stalled_backend_does_not_block_shutdown() {
    let client = RecordingClient::new();
    client.stall(BackendOperation::StartItem);
    let config = BridgeConfig {
        call_timeout: Some(Duration::from_secs(30)),
        ..Default::default()
    };
    let harness = Harness::with_config(config, client);

    harness.start_run();
    harness.start_suite("suite");
    harness.start_test("test");
    harness.passing_step(&step_in(&[("a", "x")], "click"));
    harness.end_test("test", Status::Passed);
    harness.end_suite("suite");
    harness.end_run();
    let (client, summary) = harness.finish().await;

    assert!(matches!(
        client.calls().as_slice(),
        [RecordedCall::StartLaunch { .. }]
    ));
    assert!(!summary.launch_finished);
    let (first, rest) = summary
        .diagnostics
        .split_first()
        .expect("at least one diagnostic");
    assert!(matches!(
        first,
        SessionError::Backend {
            error: ClientError::Timeout {
                operation: BackendOperation::StartItem,
                ..
            },
            ..
        }
    ));
    assert!(
        rest.iter().all(|error| matches!(
            error,
            SessionError::Backend {
                error: ClientError::Unavailable { .. },
                ..
            }
        )),
        "{rest:?}"
    );
}
