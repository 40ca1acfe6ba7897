// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{ItemKind, ItemStatus};
use thiserror::Error;

/// Error returned while parsing an [`ItemStatus`] value from a string.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error(
    "unrecognized item status: {input}\n(known values: {})",
    ItemStatus::variants().join(", "),
)]
pub struct ItemStatusParseError {
    input: String,
}

impl ItemStatusParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }

    /// Returns the string that failed to parse.
    pub fn input(&self) -> &str {
        &self.input
    }
}

/// Error returned while parsing an [`ItemKind`] value from a string.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error(
    "unrecognized item kind: {input}\n(known values: {})",
    ItemKind::variants().join(", "),
)]
pub struct ItemKindParseError {
    input: String,
}

impl ItemKindParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}
