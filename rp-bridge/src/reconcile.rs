// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keeps the chain of open step items in sync with the meta-steps of the current step.
//!
//! Each step carries the chain of meta-steps that encloses it. Consecutive steps usually share a
//! prefix of that chain: two steps inside the same `I login` meta-step both have `[I login]` as
//! their chain. Reconciliation diffs the new chain against the chain that is currently open in
//! the backend:
//!
//! * the longest identity-equal common prefix stays open and is not touched,
//! * the rest of the open chain is closed, innermost first,
//! * the rest of the new chain is opened, outermost first, each entry nested below the previous
//!   one (or below the test for the first entry, if nothing is retained).

use crate::{
    client::{ReportingAdapter, ReportingClient},
    errors::SessionError,
    status::{Rollup, Status},
    step::{Step, is_same_step},
};
use chrono::{DateTime, FixedOffset};
use rp_bridge_metadata::{ItemId, ItemKind};
use std::sync::Arc;

/// A step item that is currently open in the backend.
#[derive(Clone, Debug)]
pub struct OpenEntry {
    /// The meta-step this entry reports.
    pub step: Arc<Step>,

    /// The backend identifier, or `None` if opening the item failed.
    pub id: Option<ItemId>,

    /// The status the item will be finished with.
    pub rollup: Rollup,
}

impl OpenEntry {
    /// Creates a new entry in the passed state.
    pub fn new(step: Arc<Step>, id: Option<ItemId>) -> Self {
        Self {
            step,
            id,
            rollup: Rollup::new(),
        }
    }
}

/// What needs to change to go from the open chain to a new chain.
#[derive(Clone, Debug)]
pub struct ChainDiff {
    retained: usize,
    close_count: usize,
    to_open: Vec<Arc<Step>>,
}

impl ChainDiff {
    /// The number of leading entries of the open chain that stay open.
    pub fn retained(&self) -> usize {
        self.retained
    }

    /// The number of open entries to close.
    pub fn close_count(&self) -> usize {
        self.close_count
    }

    /// The steps to open, outermost first.
    pub fn to_open(&self) -> &[Arc<Step>] {
        &self.to_open
    }

    /// Returns true if nothing needs to change.
    pub fn is_noop(&self) -> bool {
        self.close_count == 0 && self.to_open.is_empty()
    }
}

/// The chain of step items currently open in the backend, outermost first.
#[derive(Clone, Debug, Default)]
pub struct OpenChain {
    entries: Vec<OpenEntry>,
}

impl OpenChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the open entries, outermost first.
    pub fn entries(&self) -> &[OpenEntry] {
        &self.entries
    }

    /// Returns the number of open entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is open.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Computes the diff from this chain to `new_chain`. Pure.
    pub fn plan(&self, new_chain: &[Arc<Step>]) -> ChainDiff {
        let retained = self
            .entries
            .iter()
            .zip(new_chain)
            .take_while(|(open, new)| is_same_step(Some(&*open.step), Some(&**new)))
            .count();
        ChainDiff {
            retained,
            close_count: self.entries.len() - retained,
            to_open: new_chain[retained..].to_vec(),
        }
    }

    /// Returns the identifier of the innermost entry that was opened successfully.
    ///
    /// Entries whose open call failed are skipped, so children nest below the nearest ancestor
    /// the backend knows about.
    pub fn innermost_id(&self) -> Option<&ItemId> {
        self.entries
            .iter()
            .rev()
            .find_map(|entry| entry.id.as_ref())
    }

    /// Marks every open entry as failed.
    pub fn mark_failed(&mut self) {
        for entry in &mut self.entries {
            entry.rollup.fail();
        }
    }

    /// Marks every open entry as passed. Entries that already failed stay failed.
    pub fn mark_passed(&mut self) {
        for entry in &mut self.entries {
            entry.rollup.pass();
        }
    }

    /// Removes every entry after the first `retained`, returning them innermost first.
    pub fn split_stale(&mut self, retained: usize) -> Vec<OpenEntry> {
        let retained = retained.min(self.entries.len());
        let mut stale = self.entries.split_off(retained);
        stale.reverse();
        stale
    }

    /// Removes every entry, returning them innermost first.
    pub fn take_all(&mut self) -> Vec<OpenEntry> {
        self.split_stale(0)
    }

    /// Appends a newly opened entry.
    pub fn push(&mut self, entry: OpenEntry) {
        self.entries.push(entry);
    }
}

/// The effects of a single [`reconcile`] call.
#[derive(Debug, Default)]
pub struct ReconcileOutcome {
    /// Entries that were closed, innermost first.
    pub closed: Vec<OpenEntry>,

    /// Steps that were opened, outermost first, with their identifiers.
    pub opened: Vec<(Arc<Step>, Option<ItemId>)>,

    /// Backend failures. None of them stopped reconciliation.
    pub errors: Vec<SessionError>,
}

/// Brings the open chain in line with `new_chain`, issuing backend calls in order.
///
/// Each call is awaited before the next is made, so a child's open call is only issued once the
/// parent's identifier is known. Failures are collected into the outcome rather than returned: an
/// entry that fails to open stays in the chain with no identifier, so it isn't reopened for the
/// next step, and its children nest below the nearest known ancestor.
///
/// `scope_id` parents entries with no known ancestor in the chain. It is normally the test's
/// identifier, or the suite's if the test failed to open.
pub async fn reconcile<C: ReportingClient>(
    chain: &mut OpenChain,
    new_chain: &[Arc<Step>],
    scope_id: Option<&ItemId>,
    adapter: &ReportingAdapter<C>,
    timestamp: DateTime<FixedOffset>,
) -> ReconcileOutcome {
    let diff = chain.plan(new_chain);
    let mut outcome = ReconcileOutcome::default();
    if diff.is_noop() {
        return outcome;
    }

    for entry in chain.split_stale(diff.retained) {
        if let Err(error) = close_entry(adapter, &entry, timestamp).await {
            outcome.errors.push(error);
        }
        outcome.closed.push(entry);
    }

    for step in diff.to_open {
        let parent = chain.innermost_id().or(scope_id).cloned();
        let name = step.to_string();
        let id = match adapter
            .open_item(&name, ItemKind::Step, parent.as_ref(), timestamp)
            .await
        {
            Ok(id) => Some(id),
            Err(error) => {
                outcome
                    .errors
                    .push(SessionError::backend(format!("open step `{name}`"), error));
                None
            }
        };
        outcome.opened.push((Arc::clone(&step), id.clone()));
        chain.push(OpenEntry::new(step, id));
    }

    outcome
}

/// Closes every open entry, innermost first.
pub async fn close_chain<C: ReportingClient>(
    chain: &mut OpenChain,
    adapter: &ReportingAdapter<C>,
    timestamp: DateTime<FixedOffset>,
) -> Vec<SessionError> {
    let mut errors = Vec::new();
    for entry in chain.take_all() {
        if let Err(error) = close_entry(adapter, &entry, timestamp).await {
            errors.push(error);
        }
    }
    errors
}

async fn close_entry<C: ReportingClient>(
    adapter: &ReportingAdapter<C>,
    entry: &OpenEntry,
    timestamp: DateTime<FixedOffset>,
) -> Result<(), SessionError> {
    // An entry that never opened has nothing to close.
    let Some(id) = &entry.id else {
        return Ok(());
    };
    let status: Status = entry.rollup.status();
    adapter
        .close_item(id, status, timestamp)
        .await
        .map_err(|error| SessionError::backend(format!("close step `{}`", entry.step), error))
}
