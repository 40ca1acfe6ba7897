// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Structured vocabulary for talking to a hierarchical reporting backend.
//!
//! The backend models a test run as a launch containing a tree of items
//! (suites, tests and steps). Each item is started with an [`ItemDescriptor`],
//! identified by the [`ItemId`] the backend hands back, and finished with a
//! [`FinishItem`] carrying the final [`ItemStatus`].
//!
//! These types serialize to the JSON shapes the backend's HTTP API expects.

mod descriptors;
mod errors;
mod ids;

pub use descriptors::*;
pub use errors::*;
pub use ids::*;
