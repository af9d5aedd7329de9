//! The input/output log client contract.
//!
//! The concrete broker (Kafka, Kinesis, or similar) is an out-of-scope external collaborator;
//! this crate owns the trait contracts the rest of the engine is written against, plus an
//! in-memory mock implementation used by tests.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(missing_debug_implementations, clippy::clone_on_ref_ptr)]

mod error;
pub mod mock;

pub use error::{LogClientError, LogClientErrorKind};

use async_trait::async_trait;
use std::{collections::BTreeSet, fmt::Debug, time::Duration};
use upsert_types::{InputEvent, OutputEvent, SourceOffset};

/// One record read from the input log, tagged with its partition and offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRecord {
    /// The `int32` partition hint the record was read from.
    pub partition: i32,
    /// The record's position within `partition`.
    pub offset: SourceOffset,
    /// The decoded event payload.
    pub event: InputEvent,
}

/// Produces [`InputLogStreamHandler`]s, one per partition, and owns per-partition offset
/// acknowledgement.
///
/// `ack_offset` lives here rather than on the stream handler: a real broker client commits
/// offsets through its consumer-group coordinator independently of the handler doing the
/// polling, which lets the processing loop ack concurrently with the consumer loop still
/// polling the same partition.
#[async_trait]
pub trait InputLogReading: Sync + Send + Debug + 'static {
    /// List all known partitions. Never empty for a healthy log.
    fn partition_ids(&self) -> BTreeSet<i32>;

    /// Get a stream handler for a single partition.
    ///
    /// Handlers do not share state; polling on one handler does not affect another even for the
    /// same partition.
    async fn stream_handler(
        &self,
        partition_id: i32,
    ) -> Result<Box<dyn InputLogStreamHandler>, LogClientError>;

    /// Commit `offset` as the last durably-processed offset for `partition`.
    ///
    /// Backs a per-partition max-offset table: acking a lower offset than one already
    /// committed is a no-op, never a regression.
    async fn ack_offset(&self, partition: i32, offset: SourceOffset) -> Result<(), LogClientError>;
}

/// Drives polling for one input-log partition.
#[async_trait]
pub trait InputLogStreamHandler: Sync + Send + Debug + 'static {
    /// Block for up to `max_wait` accumulating records, returning whatever arrived (possibly
    /// empty if `max_wait` elapsed with nothing new).
    async fn poll(&mut self, max_wait: Duration) -> Result<Vec<InputRecord>, LogClientError>;
}

/// A single queued output-log send, awaitable for completion.
#[derive(Debug)]
pub struct ProduceTask {
    rx: tokio::sync::oneshot::Receiver<Result<(), LogClientError>>,
}

impl ProduceTask {
    /// Construct a task backed by the receiving half of a completion channel.
    pub fn new(rx: tokio::sync::oneshot::Receiver<Result<(), LogClientError>>) -> Self {
        Self { rx }
    }

    /// Wait for this task to complete, or for `timeout` to elapse first.
    ///
    /// Returns `Err(LogClientErrorKind::BatchFailure)` on timeout or if the sender was dropped
    /// without completing the task.
    pub async fn wait(self, timeout: Duration) -> Result<(), LogClientError> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(LogClientError::new(
                LogClientErrorKind::BatchFailure,
                "producer dropped task before completion",
            )),
            Err(_) => Err(LogClientError::new(
                LogClientErrorKind::BatchFailure,
                "output producer deadline exceeded",
            )),
        }
    }
}

/// Produces [`OutputEvent`]s to the output log, partitioned by destination segment.
#[async_trait]
pub trait OutputLogWriting: Sync + Send + Debug + 'static {
    /// Submit `events` for production. Returns one [`ProduceTask`] per event, in the same order,
    /// each resolving once that event is durably written (or failed).
    ///
    /// This call may buffer internally; callers must [`flush`](Self::flush) (or wait for an
    /// internal linger) to guarantee dispatch.
    async fn batch_produce(
        &self,
        events: Vec<OutputEvent>,
    ) -> Result<Vec<ProduceTask>, LogClientError>;

    /// Force dispatch of any buffered, not-yet-sent events.
    async fn flush(&self) -> Result<(), LogClientError>;
}
