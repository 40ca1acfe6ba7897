// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A single-worker FIFO queue for asynchronous work.
//!
//! Runner events arrive without waiting for earlier reporting work to finish, but the backend
//! needs parents to exist before children are opened and children to be closed before their
//! parents. The [`Sequencer`] turns the events into jobs that run one at a time, in the order they
//! were enqueued: the next job only starts once the previous job's awaited work has completed.

use crate::errors::SequencerError;
use debug_ignore::DebugIgnore;
use std::{any::Any, future::Future};
use tokio::{
    sync::{
        mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
        oneshot,
    },
    task::JoinHandle,
};

/// State owned by a [`Sequencer`] worker, and the jobs it runs.
pub trait Sequenced: Send + 'static {
    /// A unit of work.
    type Job: Send + 'static;

    /// Runs a single job to completion.
    fn run(&mut self, job: Self::Job) -> impl Future<Output = ()> + Send;
}

/// A FIFO queue with a single worker task that owns the handler state.
///
/// Enqueueing never blocks. Jobs are committed in enqueue order.
#[derive_where::derive_where(Debug)]
pub struct Sequencer<H: Sequenced> {
    sender: UnboundedSender<Message<H::Job>>,
    handle: DebugIgnore<JoinHandle<H>>,
}

impl<H: Sequenced> Sequencer<H> {
    /// Spawns the worker onto the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn spawn(handler: H) -> Self {
        let (sender, receiver) = unbounded_channel();
        let handle = tokio::spawn(run_worker(handler, receiver));
        Self {
            sender,
            handle: DebugIgnore(handle),
        }
    }

    /// Appends a job to the queue.
    pub fn enqueue(&self, job: H::Job) -> Result<(), SequencerError> {
        self.sender
            .send(Message::Job(job))
            .map_err(|_| SequencerError::Closed)
    }

    /// Waits until every job enqueued before this call has completed.
    pub async fn flush(&self) -> Result<(), SequencerError> {
        let (sender, receiver) = oneshot::channel();
        self.sender
            .send(Message::Flush(sender))
            .map_err(|_| SequencerError::Closed)?;
        receiver.await.map_err(|_| SequencerError::Closed)
    }

    /// Closes the queue, waits for the remaining jobs to run, and returns the handler.
    pub async fn finish(self) -> Result<H, SequencerError> {
        let Self { sender, handle } = self;
        // Dropping the sender makes the worker exit once the queue is drained.
        drop(sender);
        handle.0.await.map_err(|error| {
            if error.is_panic() {
                SequencerError::WorkerPanic {
                    message: panic_payload_to_string(error.into_panic()),
                }
            } else {
                SequencerError::WorkerCancelled
            }
        })
    }
}

enum Message<J> {
    Job(J),
    Flush(oneshot::Sender<()>),
}

async fn run_worker<H: Sequenced>(
    mut handler: H,
    mut receiver: UnboundedReceiver<Message<H::Job>>,
) -> H {
    while let Some(message) = receiver.recv().await {
        match message {
            Message::Job(job) => handler.run(job).await,
            Message::Flush(done) => {
                // The flusher may have stopped waiting.
                _ = done.send(());
            }
        }
    }
    handler
}

/// Extracts a string message from a panic payload.
fn panic_payload_to_string(payload: Box<dyn Any + Send + 'static>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "(unknown panic payload)".to_owned()
    }
}
