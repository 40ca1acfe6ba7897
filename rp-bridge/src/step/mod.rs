// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Steps, meta-steps and their identity.
//!
//! A step is a single action performed by an actor (`I click "Login"`). Steps may be wrapped in a
//! meta-step representing a higher-level user action, which may itself be wrapped in another
//! meta-step. The resulting chain, from outermost to innermost, is what gets reported as nested
//! step items.

mod linearize;

pub use linearize::linearize;

use smol_str::SmolStr;
use std::{fmt, sync::Arc};

/// A step or meta-step, with an optional link to the meta-step that encloses it.
///
/// Links are shared and immutable, so a chain is always finite and acyclic.
#[derive(Clone, Debug)]
pub struct Step {
    /// The actor performing the step, e.g. `I`.
    pub actor: SmolStr,

    /// The operation name, e.g. `fillField`.
    pub name: SmolStr,

    /// The arguments, already rendered as strings.
    pub args: Vec<String>,

    /// The enclosing meta-step, if any.
    pub meta_step: Option<Arc<Step>>,
}

impl Step {
    /// Creates a new step with no enclosing meta-step.
    pub fn new(
        actor: impl Into<SmolStr>,
        name: impl Into<SmolStr>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            actor: actor.into(),
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
            meta_step: None,
        }
    }

    /// Sets the enclosing meta-step.
    pub fn with_meta_step(mut self, meta_step: Arc<Step>) -> Self {
        self.meta_step = Some(meta_step);
        self
    }

    /// Returns the chain of meta-steps enclosing this step, outermost first.
    ///
    /// The step itself is not part of the chain. A bare step produces an empty chain.
    pub fn meta_chain(&self) -> Vec<Arc<Step>> {
        self.meta_step.as_ref().map(linearize).unwrap_or_default()
    }

    /// Returns the arguments joined by commas, which is how step identity compares them.
    pub fn joined_args(&self) -> String {
        self.args.join(",")
    }

    /// Returns the operation name split into lowercase words, e.g. `amOnPage` becomes
    /// `am on page`.
    pub fn humanized_name(&self) -> String {
        let mut out = String::with_capacity(self.name.len() + 4);
        for ch in self.name.chars() {
            if ch == '_' {
                out.push(' ');
            } else if ch.is_uppercase() {
                if !out.is_empty() && !out.ends_with(' ') {
                    out.push(' ');
                }
                out.extend(ch.to_lowercase());
            } else {
                out.push(ch);
            }
        }
        out
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.actor, self.humanized_name())?;
        if !self.args.is_empty() {
            write!(f, " {}", self.args.join(", "))?;
        }
        Ok(())
    }
}

/// Returns true if `a` and `b` denote the same logical step.
///
/// Two absent steps are the same. Two present steps are the same if they have the same actor,
/// operation name and joined argument string. Backend identifiers play no part.
pub fn is_same_step(a: Option<&Step>, b: Option<&Step>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            a.actor == b.actor && a.name == b.name && a.joined_args() == b.joined_args()
        }
        _ => false,
    }
}
