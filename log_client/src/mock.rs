//! In-memory test doubles for [`crate::InputLogReading`] and [`crate::OutputLogWriting`].
//!
//! These exist purely for exercising the Key Coordinator in tests without a real broker; they
//! are not a production log client.

use crate::{
    InputLogReading, InputLogStreamHandler, InputRecord, LogClientError, LogClientErrorKind,
    OutputLogWriting, ProduceTask,
};
use async_trait::async_trait;
use observability_deps::tracing::warn;
use parking_lot::Mutex;
use std::{
    collections::{BTreeSet, HashMap, VecDeque},
    sync::Arc,
    time::Duration,
};
use upsert_types::{OutputEvent, SourceOffset};

type PartitionQueue = Arc<Mutex<VecDeque<InputRecord>>>;

/// An in-memory input log: a fixed set of partitions, each an ordinary FIFO queue.
#[derive(Debug, Clone)]
pub struct MockInputLog {
    partitions: HashMap<i32, PartitionQueue>,
    committed: Arc<Mutex<HashMap<i32, i64>>>,
}

impl MockInputLog {
    /// Create a mock log with the given partitions, all initially empty.
    pub fn new(partition_ids: impl IntoIterator<Item = i32>) -> Self {
        Self {
            partitions: partition_ids
                .into_iter()
                .map(|id| (id, Arc::new(Mutex::new(VecDeque::new()))))
                .collect(),
            committed: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Append a record to a partition's queue. Intended for test setup.
    pub fn push(&self, record: InputRecord) {
        self.partitions
            .get(&record.partition)
            .expect("unknown partition")
            .lock()
            .push_back(record);
    }

    /// Returns the last offset acked on `partition`, if any.
    pub fn committed_offset(&self, partition: i32) -> Option<i64> {
        self.committed.lock().get(&partition).copied()
    }
}

#[async_trait]
impl InputLogReading for MockInputLog {
    fn partition_ids(&self) -> BTreeSet<i32> {
        self.partitions.keys().copied().collect()
    }

    async fn stream_handler(
        &self,
        partition_id: i32,
    ) -> Result<Box<dyn InputLogStreamHandler>, LogClientError> {
        let queue = self.partitions.get(&partition_id).ok_or_else(|| {
            LogClientError::new(
                LogClientErrorKind::InvalidInput,
                format!("unknown partition {partition_id}"),
            )
        })?;

        Ok(Box::new(MockInputLogStreamHandler {
            queue: Arc::clone(queue),
        }))
    }

    async fn ack_offset(&self, partition: i32, offset: SourceOffset) -> Result<(), LogClientError> {
        if !self.partitions.contains_key(&partition) {
            return Err(LogClientError::new(
                LogClientErrorKind::InvalidInput,
                format!("unknown partition {partition}"),
            ));
        }
        let mut committed = self.committed.lock();
        let entry = committed.entry(partition).or_insert(-1);
        *entry = (*entry).max(offset.get());
        Ok(())
    }
}

#[derive(Debug)]
struct MockInputLogStreamHandler {
    queue: PartitionQueue,
}

#[async_trait]
impl InputLogStreamHandler for MockInputLogStreamHandler {
    async fn poll(&mut self, max_wait: Duration) -> Result<Vec<InputRecord>, LogClientError> {
        {
            let mut q = self.queue.lock();
            if !q.is_empty() {
                return Ok(q.drain(..).collect());
            }
        }

        // Nothing queued yet: behave like a real broker long-poll and wait up to the deadline
        // in case a test pushes a record concurrently.
        tokio::time::sleep(max_wait).await;
        Ok(self.queue.lock().drain(..).collect())
    }
}

/// How [`MockOutputLog::batch_produce`] should resolve tasks it hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailMode {
    /// Complete every task successfully.
    Succeed,
    /// Fail every task with [`LogClientErrorKind::BatchFailure`].
    Fail,
    /// Never complete tasks; exercises the completion-barrier timeout path in C10.
    Hang,
}

/// An in-memory output log: records production order and lets tests control whether
/// acknowledgement succeeds, fails, or hangs.
#[derive(Debug)]
pub struct MockOutputLog {
    produced: Mutex<Vec<OutputEvent>>,
    fail_mode: Mutex<FailMode>,
    // Keeps senders alive for `FailMode::Hang` tasks so the receiver doesn't immediately
    // observe a dropped sender; the task only ever resolves via the caller's timeout.
    hung_senders: Mutex<Vec<tokio::sync::oneshot::Sender<Result<(), LogClientError>>>>,
}

impl Default for MockOutputLog {
    fn default() -> Self {
        Self {
            produced: Mutex::new(Vec::new()),
            fail_mode: Mutex::new(FailMode::Succeed),
            hung_senders: Mutex::new(Vec::new()),
        }
    }
}

impl MockOutputLog {
    /// Create a mock output log that acknowledges everything immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Control how subsequent [`OutputLogWriting::batch_produce`] calls resolve their tasks.
    pub fn set_fail_mode(&self, mode: FailMode) {
        *self.fail_mode.lock() = mode;
    }

    /// Returns every event produced so far, in submission order.
    pub fn produced(&self) -> Vec<OutputEvent> {
        self.produced.lock().clone()
    }
}

#[async_trait]
impl OutputLogWriting for MockOutputLog {
    async fn batch_produce(
        &self,
        events: Vec<OutputEvent>,
    ) -> Result<Vec<ProduceTask>, LogClientError> {
        let mode = *self.fail_mode.lock();
        let mut tasks = Vec::with_capacity(events.len());

        for event in events {
            let (tx, rx) = tokio::sync::oneshot::channel();
            match mode {
                FailMode::Succeed => {
                    self.produced.lock().push(event);
                    let _ = tx.send(Ok(()));
                }
                FailMode::Fail => {
                    warn!("mock output log configured to fail batch");
                    let _ = tx.send(Err(LogClientError::new(
                        LogClientErrorKind::BatchFailure,
                        "mock output log configured to fail",
                    )));
                }
                FailMode::Hang => {
                    self.hung_senders.lock().push(tx);
                }
            }
            tasks.push(ProduceTask::new(rx));
        }

        Ok(tasks)
    }

    async fn flush(&self) -> Result<(), LogClientError> {
        Ok(())
    }
}
