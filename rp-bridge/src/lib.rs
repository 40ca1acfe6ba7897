// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Reports test runs to a hierarchical reporting backend.
//!
//! Test runners describe a run as a flat stream of events: suites and tests start and finish, and
//! steps run inside nested meta-steps ("I log in" wrapping "I fill field", "I click"). Reporting
//! backends instead model a run as a tree of items, where every child must be opened after its
//! parent and closed before it.
//!
//! This crate bridges the two. A [`ReportSession`](session::ReportSession) accepts
//! [`RunnerEvent`](events::RunnerEvent)s and, one at a time and in order:
//!
//! * keeps the chain of open step items in sync with the current step's meta-steps, closing the
//!   stale part of the chain and opening the new part ([`reconcile`]),
//! * rolls step and test failures up into the suite and launch status ([`status`]),
//! * issues the corresponding calls against a [`ReportingClient`](client::ReportingClient).

pub mod client;
pub mod config;
pub mod errors;
pub mod events;
pub mod reconcile;
pub mod sequencer;
pub mod session;
pub mod status;
pub mod step;
