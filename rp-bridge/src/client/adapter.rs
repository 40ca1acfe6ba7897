// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{BackendOperation, ReportingClient};
use crate::{errors::ClientError, status::Status};
use chrono::{DateTime, FixedOffset};
use rp_bridge_metadata::{
    Attachment, FinishItem, FinishLaunch, ItemDescriptor, ItemId, ItemKind, LaunchDescriptor,
    LaunchId, LogEntry, LogLevel,
};
use std::{
    fmt,
    future::Future,
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};
use tracing::{debug, error, info};

/// Translates open/close/log requests into [`ReportingClient`] calls.
///
/// The adapter remembers the launch identifier once the launch has started, maps the runner's
/// [`Status`] to the backend's vocabulary, and enforces the optional per-call timeout. After the
/// first timeout, reporting is considered unavailable and every later call fails fast with
/// [`ClientError::Unavailable`].
#[derive(Debug)]
pub struct ReportingAdapter<C> {
    client: C,
    launch: Option<LaunchId>,
    call_timeout: Option<Duration>,
    verbose: bool,
    unavailable: AtomicBool,
}

impl<C: ReportingClient> ReportingAdapter<C> {
    /// Creates a new adapter.
    ///
    /// If `verbose` is true, every backend call is logged at info level rather than debug.
    pub fn new(client: C, call_timeout: Option<Duration>, verbose: bool) -> Self {
        Self {
            client,
            launch: None,
            call_timeout,
            verbose,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Returns the launch identifier, if the launch has started.
    pub fn launch_id(&self) -> Option<&LaunchId> {
        self.launch.as_ref()
    }

    /// Returns false once a call has timed out.
    pub fn is_available(&self) -> bool {
        !self.unavailable.load(Ordering::Relaxed)
    }

    /// Starts the launch and remembers its identifier.
    pub async fn start_launch(
        &mut self,
        descriptor: &LaunchDescriptor,
    ) -> Result<LaunchId, ClientError> {
        let id = self
            .guarded(
                BackendOperation::StartLaunch,
                self.client.start_launch(descriptor),
            )
            .await?;
        self.log_call(format_args!("{id}: launch `{}` started", descriptor.name));
        self.launch = Some(id.clone());
        Ok(id)
    }

    /// Opens a suite, test or step item nested below `parent`, or at the launch root if `parent`
    /// is `None`.
    pub async fn open_item(
        &self,
        name: &str,
        kind: ItemKind,
        parent: Option<&ItemId>,
        start_time: DateTime<FixedOffset>,
    ) -> Result<ItemId, ClientError> {
        let Some(launch) = &self.launch else {
            return Err(ClientError::Unavailable {
                operation: BackendOperation::StartItem,
            });
        };
        let descriptor = ItemDescriptor::new(name, kind, start_time);
        let id = self
            .guarded(
                BackendOperation::StartItem,
                self.client.start_item(&descriptor, launch, parent),
            )
            .await?;
        match parent {
            Some(parent) => {
                self.log_call(format_args!("{id}: {kind} `{name}` started under {parent}"))
            }
            None => self.log_call(format_args!("{id}: {kind} `{name}` started")),
        }
        Ok(id)
    }

    /// Closes an item with the given status.
    pub async fn close_item(
        &self,
        id: &ItemId,
        status: Status,
        end_time: DateTime<FixedOffset>,
    ) -> Result<(), ClientError> {
        let finish = FinishItem {
            end_time,
            status: status.to_item_status(),
        };
        self.guarded(
            BackendOperation::FinishItem,
            self.client.finish_item(id, &finish),
        )
        .await?;
        self.log_call(format_args!("{id}: finished {}", finish.status));
        Ok(())
    }

    /// Attaches a log line, and optionally a file, to an item.
    pub async fn send_log(
        &self,
        id: &ItemId,
        level: LogLevel,
        message: String,
        time: DateTime<FixedOffset>,
        attachment: Option<&Attachment>,
    ) -> Result<(), ClientError> {
        let entry = LogEntry {
            level,
            message,
            time,
        };
        self.guarded(
            BackendOperation::SendLog,
            self.client.send_log(id, &entry, attachment),
        )
        .await?;
        self.log_call(format_args!("{id}: sent {level:?} log"));
        Ok(())
    }

    /// Finishes the launch with the given aggregate status.
    pub async fn finish_launch(
        &self,
        status: Status,
        end_time: DateTime<FixedOffset>,
    ) -> Result<(), ClientError> {
        let Some(launch) = &self.launch else {
            return Err(ClientError::Unavailable {
                operation: BackendOperation::FinishLaunch,
            });
        };
        let finish = FinishLaunch {
            end_time,
            status: status.to_item_status(),
        };
        self.guarded(
            BackendOperation::FinishLaunch,
            self.client.finish_launch(launch, &finish),
        )
        .await?;
        self.log_call(format_args!("{launch}: launch finished {}", finish.status));
        Ok(())
    }

    // ---
    // Helper methods
    // ---

    async fn guarded<T>(
        &self,
        operation: BackendOperation,
        call: impl Future<Output = Result<T, ClientError>>,
    ) -> Result<T, ClientError> {
        if !self.is_available() {
            return Err(ClientError::Unavailable { operation });
        }

        let Some(timeout) = self.call_timeout else {
            return call.await;
        };
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                if !self.unavailable.swap(true, Ordering::Relaxed) {
                    error!(
                        "{operation} did not complete within {timeout:?}, \
                         skipping further reporting for this run"
                    );
                }
                Err(ClientError::Timeout { operation, timeout })
            }
        }
    }

    fn log_call(&self, args: fmt::Arguments<'_>) {
        if self.verbose {
            info!("{args}");
        } else {
            debug!("{args}");
        }
    }
}
