// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The reporting backend, as seen by the session.
//!
//! [`ReportingClient`] is the seam to the remote service: it exposes the backend's primitive
//! operations and nothing else. [`ReportingAdapter`] sits on top and translates the session's
//! open/close/log requests into those primitives, applying timeouts and logging along the way.

mod adapter;
mod recording;

pub use adapter::ReportingAdapter;
pub use recording::{RecordedCall, RecordedItem, RecordingClient};

use crate::errors::ClientError;
use rp_bridge_metadata::{
    Attachment, FinishItem, FinishLaunch, ItemDescriptor, ItemId, LaunchDescriptor, LaunchId,
    LogEntry,
};
use std::{fmt, future::Future, sync::Arc};

/// A primitive operation exposed by the backend.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum BackendOperation {
    /// Start a launch.
    StartLaunch,

    /// Finish a launch.
    FinishLaunch,

    /// Start a suite, test or step item.
    StartItem,

    /// Finish an item.
    FinishItem,

    /// Attach a log entry to an item.
    SendLog,
}

impl fmt::Display for BackendOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendOperation::StartLaunch => write!(f, "start-launch"),
            BackendOperation::FinishLaunch => write!(f, "finish-launch"),
            BackendOperation::StartItem => write!(f, "start-item"),
            BackendOperation::FinishItem => write!(f, "finish-item"),
            BackendOperation::SendLog => write!(f, "send-log"),
        }
    }
}

/// A client for a hierarchical reporting backend.
///
/// Each call resolves once the backend has acknowledged it. In particular, `start_item` resolves
/// to the identifier the backend assigned, which callers then pass as the parent of child items.
///
/// Implementations must not retry failed calls.
pub trait ReportingClient: Send + Sync + 'static {
    /// Starts a launch and returns its identifier.
    fn start_launch(
        &self,
        launch: &LaunchDescriptor,
    ) -> impl Future<Output = Result<LaunchId, ClientError>> + Send;

    /// Finishes a launch.
    fn finish_launch(
        &self,
        launch: &LaunchId,
        finish: &FinishLaunch,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Starts an item under `launch`, nested below `parent` if given, and returns its identifier.
    fn start_item(
        &self,
        item: &ItemDescriptor,
        launch: &LaunchId,
        parent: Option<&ItemId>,
    ) -> impl Future<Output = Result<ItemId, ClientError>> + Send;

    /// Finishes an item.
    fn finish_item(
        &self,
        item: &ItemId,
        finish: &FinishItem,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Attaches a log entry, and optionally a file, to an item.
    fn send_log(
        &self,
        item: &ItemId,
        entry: &LogEntry,
        attachment: Option<&Attachment>,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;
}

impl<C: ReportingClient> ReportingClient for Arc<C> {
    fn start_launch(
        &self,
        launch: &LaunchDescriptor,
    ) -> impl Future<Output = Result<LaunchId, ClientError>> + Send {
        (**self).start_launch(launch)
    }

    fn finish_launch(
        &self,
        launch: &LaunchId,
        finish: &FinishLaunch,
    ) -> impl Future<Output = Result<(), ClientError>> + Send {
        (**self).finish_launch(launch, finish)
    }

    fn start_item(
        &self,
        item: &ItemDescriptor,
        launch: &LaunchId,
        parent: Option<&ItemId>,
    ) -> impl Future<Output = Result<ItemId, ClientError>> + Send {
        (**self).start_item(item, launch, parent)
    }

    fn finish_item(
        &self,
        item: &ItemId,
        finish: &FinishItem,
    ) -> impl Future<Output = Result<(), ClientError>> + Send {
        (**self).finish_item(item, finish)
    }

    fn send_log(
        &self,
        item: &ItemId,
        entry: &LogEntry,
        attachment: Option<&Attachment>,
    ) -> impl Future<Output = Result<(), ClientError>> + Send {
        (**self).send_log(item, entry, attachment)
    }
}
