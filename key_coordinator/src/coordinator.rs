use crate::{
    config::ProcessingConfig,
    consumer,
    lifecycle::{RunState, ShutdownHandle},
    processor,
    resolver::ConflictResolver,
};
use backoff::BackoffConfig;
use iox_time::TimeProvider;
use kv_store::ContextStore;
use log_client::InputLogReading;
use log_client::OutputLogWriting;
use observability_deps::tracing::warn;
use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;

struct RunningTasks {
    consumers: Vec<JoinHandle<()>>,
    processor: JoinHandle<()>,
}

/// Owns the lifecycle of the consumer loop and processing loop: spawns one consumer task per
/// input-log partition feeding a shared hand-off queue, and a single processor task draining it.
#[derive(Debug)]
pub struct KeyCoordinator {
    shutdown: Arc<ShutdownHandle>,
    termination_wait: Duration,
    time_provider: Arc<dyn TimeProvider>,
    tasks: Mutex<Option<RunningTasks>>,
}

impl KeyCoordinator {
    /// Create a coordinator that, on [`Self::stop`], waits up to `termination_wait` for the
    /// in-flight batch to finish before giving up on a clean shutdown.
    ///
    /// `time_provider` drives the processing loop's wall-clock batch-assembly deadline; inject a
    /// mock in tests rather than relying on real sleeps.
    pub fn new(termination_wait: Duration, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            shutdown: Arc::new(ShutdownHandle::new()),
            termination_wait,
            time_provider,
            tasks: Mutex::new(None),
        }
    }

    /// The shutdown handle, shared with every spawned task.
    pub fn shutdown_handle(&self) -> Arc<ShutdownHandle> {
        Arc::clone(&self.shutdown)
    }

    /// Spawn the consumer and processor loops.
    ///
    /// # Panics
    ///
    /// Panics if called more than once on the same coordinator without an intervening
    /// [`Self::stop`].
    pub async fn run(
        &self,
        input_log: Arc<dyn InputLogReading>,
        kv_store: Arc<dyn ContextStore>,
        resolver: Arc<dyn ConflictResolver>,
        output: Arc<dyn OutputLogWriting>,
        config: ProcessingConfig,
        backoff_config: BackoffConfig,
    ) -> Result<(), log_client::LogClientError> {
        assert!(
            self.tasks.lock().is_none(),
            "KeyCoordinator::run called while already running"
        );

        let (queue_tx, queue_rx) = tokio::sync::mpsc::channel(config.consumer_blocking_queue_size());

        let mut consumers = Vec::new();
        for partition_id in input_log.partition_ids() {
            let handler = input_log.stream_handler(partition_id).await?;
            let queue_tx = queue_tx.clone();
            let shutdown = Arc::clone(&self.shutdown);
            let backoff_config = backoff_config.clone();
            consumers.push(tokio::spawn(consumer::run(
                handler,
                queue_tx,
                shutdown,
                config.fetch_msg_max_delay(),
                backoff_config,
            )));
        }
        drop(queue_tx);

        let processor = tokio::spawn(processor::run(
            queue_rx,
            Arc::clone(&input_log),
            kv_store,
            resolver,
            output,
            Arc::clone(&self.shutdown),
            config,
            Arc::clone(&self.time_provider),
        ));

        *self.tasks.lock() = Some(RunningTasks { consumers, processor });
        self.shutdown.mark_running();
        Ok(())
    }

    /// Signal cooperative shutdown and wait up to `termination_wait` for both loops to exit.
    ///
    /// If the deadline elapses first the in-flight batch is abandoned mid-processing; this is
    /// safe, since nothing commits (input offsets, key→context writes) until a batch fully
    /// succeeds.
    pub async fn stop(&self) {
        self.shutdown.stop();

        let tasks = self.tasks.lock().take();
        if let Some(RunningTasks { consumers, processor }) = tasks {
            let join_all = async move {
                for consumer in consumers {
                    let _ = consumer.await;
                }
                let _ = processor.await;
            };

            if tokio::time::timeout(self.termination_wait, join_all)
                .await
                .is_err()
            {
                warn!("coordinator shutdown exceeded termination wait, in-flight batch abandoned");
            }
        }

        self.shutdown.mark_shutdown();
    }

    /// The coordinator's current lifecycle state.
    pub fn state(&self) -> RunState {
        self.shutdown.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::TimestampThenOffsetResolver;
    use iox_time::SystemProvider;
    use kv_store::MemoryContextStore;
    use log_client::mock::{MockInputLog, MockOutputLog};
    use upsert_types::{InputEvent, MessageContext, PrimaryKey, SegmentName, SourceOffset, TableName};

    fn cfg() -> ProcessingConfig {
        ProcessingConfig::new(
            Duration::from_millis(5),
            Duration::from_millis(20),
            10,
            64,
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn end_to_end_single_event_reaches_the_output_log() {
        let input_log = Arc::new(MockInputLog::new([0]));
        input_log.push(log_client::InputRecord {
            partition: 0,
            offset: SourceOffset::new(42),
            event: InputEvent::new(
                TableName::from("orders"),
                PrimaryKey::from("k1"),
                MessageContext::new(SegmentName::from("s1"), SourceOffset::new(42), 7),
            ),
        });

        let kv_store = Arc::new(MemoryContextStore::new());
        let output_log = Arc::new(MockOutputLog::new());

        let coordinator = KeyCoordinator::new(Duration::from_secs(5), Arc::new(SystemProvider::new()));
        coordinator
            .run(
                input_log.clone(),
                kv_store.clone(),
                Arc::new(TimestampThenOffsetResolver),
                output_log.clone(),
                cfg(),
                BackoffConfig::default(),
            )
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if !output_log.produced().is_empty() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("event should reach the output log");

        coordinator.stop().await;
        assert_eq!(coordinator.state(), RunState::Shutdown);
        assert_eq!(input_log.committed_offset(0), Some(42));
    }

    #[tokio::test]
    async fn stop_is_safe_to_call_on_an_idle_coordinator() {
        let coordinator = KeyCoordinator::new(Duration::from_millis(50), Arc::new(SystemProvider::new()));
        coordinator.stop().await;
        assert_eq!(coordinator.state(), RunState::Shutdown);
    }
}
