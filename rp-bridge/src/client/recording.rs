// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! An in-memory backend.

use super::{BackendOperation, ReportingClient};
use crate::errors::ClientError;
use rp_bridge_metadata::{
    Attachment, FinishItem, FinishLaunch, ItemDescriptor, ItemId, ItemKind, ItemStatus,
    LaunchDescriptor, LaunchId, LogEntry, LogLevel,
};
use std::{
    collections::{BTreeSet, HashSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

/// A call accepted by a [`RecordingClient`], in the order it was accepted.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RecordedCall {
    /// A launch was started.
    StartLaunch {
        /// The identifier handed out.
        id: LaunchId,

        /// The launch descriptor.
        descriptor: LaunchDescriptor,
    },

    /// A launch was finished.
    FinishLaunch {
        /// The launch.
        id: LaunchId,

        /// The final status.
        status: ItemStatus,
    },

    /// An item was started.
    StartItem {
        /// The identifier handed out.
        id: ItemId,

        /// The item name.
        name: String,

        /// The item kind.
        kind: ItemKind,

        /// The parent item, if any.
        parent: Option<ItemId>,
    },

    /// An item was finished.
    FinishItem {
        /// The item.
        id: ItemId,

        /// The final status.
        status: ItemStatus,
    },

    /// A log entry was attached to an item.
    SendLog {
        /// The item.
        id: ItemId,

        /// The log level.
        level: LogLevel,

        /// The message.
        message: String,

        /// The name of the attached file, if any.
        attachment: Option<String>,
    },
}

/// An item as seen by a [`RecordingClient`], reconstructed from its calls.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RecordedItem {
    /// The identifier handed out.
    pub id: ItemId,

    /// The item name.
    pub name: String,

    /// The item kind.
    pub kind: ItemKind,

    /// The parent item, if any.
    pub parent: Option<ItemId>,

    /// Every status the item was finished with. A well-formed run finishes each item once.
    pub statuses: Vec<ItemStatus>,
}

/// A [`ReportingClient`] that keeps everything in memory.
///
/// Identifiers are handed out sequentially (`launch-1`, `item-1`, `item-2`, ...). Every accepted
/// call is recorded in order. Operations can be made to fail or to never complete, which is how
/// the failure paths of the session are exercised.
///
/// Clones share the same state, so a test can hand one clone to a session and inspect another.
#[derive(Clone, Debug, Default)]
pub struct RecordingClient {
    inner: Arc<Mutex<RecordingState>>,
}

#[derive(Debug, Default)]
struct RecordingState {
    next_launch: usize,
    next_item: usize,
    calls: Vec<RecordedCall>,
    rejected_operations: HashSet<BackendOperation>,
    rejected_names: BTreeSet<String>,
    stalled: HashSet<BackendOperation>,
    latency: Option<Duration>,
}

impl RecordingClient {
    /// Creates a new client with no recorded calls.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call of `operation` fail.
    pub fn reject(&self, operation: BackendOperation) {
        self.state().rejected_operations.insert(operation);
    }

    /// Makes `start_item` fail for items named `name`.
    pub fn reject_item(&self, name: impl Into<String>) {
        self.state().rejected_names.insert(name.into());
    }

    /// Makes every call of `operation` never complete.
    pub fn stall(&self, operation: BackendOperation) {
        self.state().stalled.insert(operation);
    }

    /// Makes every call sleep for `latency` before completing.
    pub fn set_latency(&self, latency: Duration) {
        self.state().latency = Some(latency);
    }

    /// Returns all accepted calls, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    /// Returns all started items, in start order, with the statuses they were finished with.
    pub fn items(&self) -> Vec<RecordedItem> {
        let state = self.state();
        let mut items: Vec<RecordedItem> = Vec::new();
        for call in &state.calls {
            match call {
                RecordedCall::StartItem {
                    id,
                    name,
                    kind,
                    parent,
                } => items.push(RecordedItem {
                    id: id.clone(),
                    name: name.clone(),
                    kind: *kind,
                    parent: parent.clone(),
                    statuses: Vec::new(),
                }),
                RecordedCall::FinishItem { id, status } => {
                    if let Some(item) = items.iter_mut().find(|item| &item.id == id) {
                        item.statuses.push(*status);
                    }
                }
                _ => {}
            }
        }
        items
    }

    /// Returns the item with the given name, if exactly one was started.
    pub fn item_named(&self, name: &str) -> Option<RecordedItem> {
        let mut matching = self.items().into_iter().filter(|item| item.name == name);
        match (matching.next(), matching.next()) {
            (Some(item), None) => Some(item),
            _ => None,
        }
    }

    /// Returns the status the launch was finished with, if it was finished.
    pub fn launch_status(&self) -> Option<ItemStatus> {
        self.state().calls.iter().find_map(|call| match call {
            RecordedCall::FinishLaunch { status, .. } => Some(*status),
            _ => None,
        })
    }

    fn state(&self) -> MutexGuard<'_, RecordingState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn enter(&self, operation: BackendOperation) -> Result<(), ClientError> {
        let (latency, stalled, rejected) = {
            let state = self.state();
            (
                state.latency,
                state.stalled.contains(&operation),
                state.rejected_operations.contains(&operation),
            )
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if stalled {
            std::future::pending::<()>().await;
        }
        if rejected {
            return Err(ClientError::rejected(
                operation,
                "rejected by recording client",
            ));
        }
        Ok(())
    }
}

impl ReportingClient for RecordingClient {
    async fn start_launch(&self, launch: &LaunchDescriptor) -> Result<LaunchId, ClientError> {
        self.enter(BackendOperation::StartLaunch).await?;
        let mut state = self.state();
        state.next_launch += 1;
        let id = LaunchId::new(format!("launch-{}", state.next_launch));
        state.calls.push(RecordedCall::StartLaunch {
            id: id.clone(),
            descriptor: launch.clone(),
        });
        Ok(id)
    }

    async fn finish_launch(
        &self,
        launch: &LaunchId,
        finish: &FinishLaunch,
    ) -> Result<(), ClientError> {
        self.enter(BackendOperation::FinishLaunch).await?;
        self.state().calls.push(RecordedCall::FinishLaunch {
            id: launch.clone(),
            status: finish.status,
        });
        Ok(())
    }

    async fn start_item(
        &self,
        item: &ItemDescriptor,
        _launch: &LaunchId,
        parent: Option<&ItemId>,
    ) -> Result<ItemId, ClientError> {
        self.enter(BackendOperation::StartItem).await?;
        let mut state = self.state();
        if state.rejected_names.contains(&item.name) {
            return Err(ClientError::rejected(
                BackendOperation::StartItem,
                format!("item `{}` rejected by recording client", item.name),
            ));
        }
        state.next_item += 1;
        let id = ItemId::new(format!("item-{}", state.next_item));
        state.calls.push(RecordedCall::StartItem {
            id: id.clone(),
            name: item.name.clone(),
            kind: item.kind,
            parent: parent.cloned(),
        });
        Ok(id)
    }

    async fn finish_item(&self, item: &ItemId, finish: &FinishItem) -> Result<(), ClientError> {
        self.enter(BackendOperation::FinishItem).await?;
        self.state().calls.push(RecordedCall::FinishItem {
            id: item.clone(),
            status: finish.status,
        });
        Ok(())
    }

    async fn send_log(
        &self,
        item: &ItemId,
        entry: &LogEntry,
        attachment: Option<&Attachment>,
    ) -> Result<(), ClientError> {
        self.enter(BackendOperation::SendLog).await?;
        self.state().calls.push(RecordedCall::SendLog {
            id: item.clone(),
            level: entry.level,
            message: entry.message.clone(),
            attachment: attachment.map(|a| a.name.clone()),
        });
        Ok(())
    }
}
