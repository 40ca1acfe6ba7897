// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Open/close ordering across whole runs.

use crate::fixtures::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rp_bridge::{
    client::{RecordedCall, RecordingClient},
    config::BridgeConfig,
    errors::SessionError,
    status::Status,
};
use rp_bridge_metadata::{ItemKind, ItemStatus};
use std::time::Duration;
use test_strategy::proptest;

#[tokio::test(start_paused = true)]
async fn children_wait_for_parent_acknowledgement() {
    let client = RecordingClient::new();
    client.set_latency(Duration::from_millis(50));
    let harness = Harness::with_config(BridgeConfig::default(), client);

    harness.start_run();
    harness.start_suite("suite");
    harness.start_test("test");
    harness.passing_step(&step_in(&[("a", "x"), ("b", "y"), ("c", "z")], "click"));
    harness.end_test("test", Status::Passed);
    harness.end_suite("suite");
    harness.end_run();
    let (client, summary) = harness.finish().await;

    let suite = client.item_named("suite").unwrap();
    let test = client.item_named("test").unwrap();
    let a = client.item_named("I a x").unwrap();
    let b = client.item_named("I b y").unwrap();
    let c = client.item_named("I c z").unwrap();
    assert_eq!(test.parent, Some(suite.id));
    assert_eq!(a.parent, Some(test.id));
    assert_eq!(b.parent, Some(a.id));
    assert_eq!(c.parent, Some(b.id));
    assert_well_formed(&client.calls());
    assert!(summary.is_clean(), "{:?}", summary.diagnostics);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn events_can_be_reported_from_other_threads() {
    let harness = Harness::new();
    std::thread::scope(|s| {
        s.spawn(|| {
            harness.start_run();
            harness.start_suite("suite");
            for i in 0..10 {
                let title = format!("test {i}");
                harness.start_test(&title);
                harness.passing_step(&step_in(&[("a", "x")], "click"));
                harness.passing_step(&step_in(&[("a", "x"), ("b", "y")], "click"));
                harness.end_test(&title, Status::Passed);
            }
            harness.end_suite("suite");
            harness.end_run();
        });
    });
    let (client, summary) = harness.finish().await;

    assert_eq!(summary.tests, 10);
    assert!(summary.launch_finished);
    assert_well_formed(&client.calls());
}

#[tokio::test]
async fn unfinished_scopes_are_closed_at_the_next_boundary() {
    let harness = Harness::new();
    harness.start_run();
    harness.start_suite("first");
    harness.start_test("abandoned");
    harness.passing_step(&step_in(&[("a", "x")], "click"));
    // No test-end or suite-end for `first`.
    harness.start_suite("second");
    harness.flush().await;

    let calls = harness.client.calls();
    let first = harness.client.item_named("first").unwrap();
    let abandoned = harness.client.item_named("abandoned").unwrap();
    let a = harness.client.item_named("I a x").unwrap();
    let second = harness.client.item_named("second").unwrap();

    let second_start = position(&calls, is_start(&second.id));
    let a_end = position(&calls, is_finish(&a.id));
    let abandoned_end = position(&calls, is_finish(&abandoned.id));
    let first_end = position(&calls, is_finish(&first.id));
    assert!(a_end < abandoned_end);
    assert!(abandoned_end < first_end);
    assert!(first_end < second_start);

    harness.end_suite("second");
    harness.end_run();
    let (client, summary) = harness.finish().await;
    assert_well_formed(&client.calls());
    // Closing dangling scopes is not an error.
    assert!(summary.is_clean(), "{:?}", summary.diagnostics);
}

#[tokio::test]
async fn test_start_closes_unfinished_test() {
    let harness = Harness::new();
    harness.start_run();
    harness.start_suite("suite");
    harness.start_test("first");
    harness.failing_step(&step_in(&[("a", "x")], "click"), "boom");
    harness.start_test("second");
    harness.end_test("second", Status::Passed);
    harness.end_suite("suite");
    harness.end_run();
    let (client, summary) = harness.finish().await;

    // The step failure alone does not fail the test.
    assert_eq!(
        client.item_named("first").unwrap().statuses,
        [ItemStatus::Passed]
    );
    assert_eq!(
        client.item_named("I a x").unwrap().statuses,
        [ItemStatus::Failed]
    );
    assert_eq!(summary.tests, 2);
    assert_well_formed(&client.calls());
}

#[tokio::test]
async fn finish_closes_everything_without_run_result() {
    let harness = Harness::new();
    harness.start_run();
    harness.start_suite("suite");
    harness.start_test("test");
    harness.passing_step(&step_in(&[("a", "x"), ("b", "y")], "click"));
    harness.send(rp_bridge::events::RunnerEventKind::TestFailed {
        test: rp_bridge::events::TestInfo::new("test"),
        error: "timed out".to_owned(),
    });
    let (client, summary) = harness.finish().await;

    assert!(summary.launch_finished);
    assert_eq!(summary.launch_status, Status::Failed);
    assert_eq!(client.launch_status(), Some(ItemStatus::Failed));
    assert_well_formed(&client.calls());
}

#[tokio::test]
async fn events_after_run_result_are_dropped() {
    let harness = Harness::new();
    harness.start_run();
    harness.end_run();
    harness.start_suite("late");
    let (client, summary) = harness.finish().await;

    assert!(client.item_named("late").is_none());
    assert!(matches!(
        summary.diagnostics.as_slice(),
        [SessionError::RunFinished {
            event: "suite-start"
        }]
    ));
}

type Chain = Vec<(u8, u8)>;

fn chain_strategy() -> impl Strategy<Value = Chain> {
    prop::collection::vec((0u8..3, 0u8..2), 0..4)
}

fn test_plan_strategy() -> impl Strategy<Value = Vec<(Chain, bool)>> {
    prop::collection::vec((chain_strategy(), prop::bool::weighted(0.2)), 0..6)
}

fn run_strategy() -> impl Strategy<Value = Vec<Vec<Vec<(Chain, bool)>>>> {
    prop::collection::vec(prop::collection::vec(test_plan_strategy(), 1..4), 1..3)
}

/// The number of step items a test should open: prefixes shared with the previous step's chain
/// are reused.
fn expected_step_opens(steps: &[(Chain, bool)]) -> usize {
    let mut previous: &[(u8, u8)] = &[];
    let mut opens = 0;
    for (chain, _) in steps {
        let shared = previous
            .iter()
            .zip(chain)
            .take_while(|(a, b)| a == b)
            .count();
        opens += chain.len() - shared;
        previous = chain;
    }
    opens
}

#[proptest(cases = 48)]
fn random_runs_are_well_formed(
    #[strategy(run_strategy())] suites: Vec<Vec<Vec<(Chain, bool)>>>,
) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let (client, summary) = runtime.block_on(async {
        let harness = Harness::new();
        harness.start_run();
        for (suite_index, tests) in suites.iter().enumerate() {
            let suite = format!("suite {suite_index}");
            harness.start_suite(&suite);
            for (test_index, steps) in tests.iter().enumerate() {
                let test = format!("test {suite_index}.{test_index}");
                harness.start_test(&test);
                for (chain, fails) in steps {
                    let names: Vec<_> = chain
                        .iter()
                        .map(|(name, arg)| (format!("m{name}"), arg.to_string()))
                        .collect();
                    let metas: Vec<_> = names
                        .iter()
                        .map(|(name, arg)| (name.as_str(), arg.as_str()))
                        .collect();
                    let step = step_in(&metas, "act");
                    if *fails {
                        harness.failing_step(&step, "failed");
                    } else {
                        harness.passing_step(&step);
                    }
                }
                let failed = steps.iter().any(|(_, fails)| *fails);
                let status = if failed {
                    Status::Failed
                } else {
                    Status::Passed
                };
                harness.end_test(&test, status);
            }
            harness.end_suite(&suite);
        }
        harness.end_run();
        harness.finish().await
    });

    let calls = client.calls();
    assert_well_formed(&calls);
    prop_assert!(summary.is_clean(), "{:?}", summary.diagnostics);

    let any_failed = suites.iter().flatten().flatten().any(|(_, fails)| *fails);
    let expected_launch = if any_failed {
        ItemStatus::Failed
    } else {
        ItemStatus::Passed
    };
    prop_assert_eq!(client.launch_status(), Some(expected_launch));

    let step_opens = calls
        .iter()
        .filter(|call| {
            matches!(
                call,
                RecordedCall::StartItem {
                    kind: ItemKind::Step,
                    ..
                }
            )
        })
        .count();
    let expected_opens: usize = suites
        .iter()
        .flatten()
        .map(|steps| expected_step_opens(steps))
        .sum();
    prop_assert_eq!(step_opens, expected_opens);
}
