// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::Step;
use std::{collections::HashSet, sync::Arc};
use tracing::warn;

/// Flattens a step and its enclosing meta-steps into a list, outermost first and `node` last.
///
/// The output length equals the depth of the chain. Calling this twice on the same input produces
/// the same list.
pub fn linearize(node: &Arc<Step>) -> Vec<Arc<Step>> {
    let mut chain = Vec::new();
    // Nodes seen so far, by address.
    let mut visited = HashSet::new();
    let mut current = Some(node);

    while let Some(step) = current {
        if !visited.insert(Arc::as_ptr(step)) {
            warn!(
                "meta-step chain revisits `{step}`, truncating at depth {}",
                chain.len()
            );
            break;
        }
        chain.push(Arc::clone(step));
        current = step.meta_step.as_ref();
    }

    chain.reverse();
    chain
}
