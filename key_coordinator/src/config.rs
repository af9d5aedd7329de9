use std::time::Duration;

/// The coordinator's tunable batch-assembly and backpressure knobs.
///
/// `kvStore.*` is deliberately not represented here: it is passed straight through to whichever
/// [`kv_store::ContextStore`] implementation the caller constructs.
#[derive(Debug, Clone, Copy)]
pub struct ProcessingConfig {
    /// Inter-drain sleep inside batch assembly.
    fetch_msg_delay: Duration,
    /// Wall-clock ceiling on batch assembly.
    fetch_msg_max_delay: Duration,
    /// Record ceiling on batch assembly.
    fetch_msg_max_batch_size: usize,
    /// Hand-off queue capacity between the consumer and processor loops; also the
    /// backpressure lever.
    consumer_blocking_queue_size: usize,
    /// Bounded wait for output producer completion per batch.
    output_ack_timeout: Duration,
}

impl ProcessingConfig {
    /// Build a new [`ProcessingConfig`].
    ///
    /// # Panics
    ///
    /// Panics if `fetch_msg_delay` exceeds `fetch_msg_max_delay` (batch assembly could never
    /// make progress), or if `fetch_msg_max_batch_size` or `consumer_blocking_queue_size` is
    /// zero.
    pub fn new(
        fetch_msg_delay: Duration,
        fetch_msg_max_delay: Duration,
        fetch_msg_max_batch_size: usize,
        consumer_blocking_queue_size: usize,
        output_ack_timeout: Duration,
    ) -> Self {
        assert!(
            fetch_msg_delay <= fetch_msg_max_delay,
            "fetch_msg_delay must not exceed fetch_msg_max_delay"
        );
        assert!(
            fetch_msg_max_batch_size > 0,
            "fetch_msg_max_batch_size must be greater than zero"
        );
        assert!(
            consumer_blocking_queue_size > 0,
            "consumer_blocking_queue_size must be greater than zero"
        );

        Self {
            fetch_msg_delay,
            fetch_msg_max_delay,
            fetch_msg_max_batch_size,
            consumer_blocking_queue_size,
            output_ack_timeout,
        }
    }

    /// Inter-drain sleep inside batch assembly.
    pub fn fetch_msg_delay(&self) -> Duration {
        self.fetch_msg_delay
    }

    /// Wall-clock ceiling on batch assembly.
    pub fn fetch_msg_max_delay(&self) -> Duration {
        self.fetch_msg_max_delay
    }

    /// Record ceiling on batch assembly.
    pub fn fetch_msg_max_batch_size(&self) -> usize {
        self.fetch_msg_max_batch_size
    }

    /// Hand-off queue capacity between the consumer and processor loops.
    pub fn consumer_blocking_queue_size(&self) -> usize {
        self.consumer_blocking_queue_size
    }

    /// Bounded wait for output producer completion per batch.
    pub fn output_ack_timeout(&self) -> Duration {
        self.output_ack_timeout
    }
}
