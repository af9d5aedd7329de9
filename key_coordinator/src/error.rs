use snafu::Snafu;

/// Coordinator-wide error kinds.
///
/// Distinguishes every kind the processing loop can encounter as its own variant, so callers
/// match on recoverability instead of inspecting strings. `TransientIo` and `BatchFailure` are
/// deliberately handled identically by the processing loop: both abort the current batch without
/// committing input offsets or writing to the key→context store, and the batch is retried next
/// cycle. `Config` and `Lookup` wrap failures surfaced by the segment a batch is being applied
/// to; `Shutdown` is cooperative and expected.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CoordinatorError {
    /// A segment was misconfigured at construction time; fatal, not retriable.
    #[snafu(display("segment configuration error: {source}"))]
    Config { source: upsert_segment::ConfigError },

    /// An incoming event's offset could not be resolved against a segment's index.
    #[snafu(display("segment lookup error: {source}"))]
    Lookup { source: upsert_segment::LookupError },

    /// A transient I/O failure reading the input log, writing the output log, or reading/writing
    /// the key→context store.
    #[snafu(display("transient I/O error: {source}"))]
    TransientIo {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The output producer's completion deadline was exceeded, or part of a batch failed.
    #[snafu(display("output batch failure: {source}"))]
    BatchFailure {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Cooperative shutdown was signalled mid-operation. Expected; callers must not retry.
    #[snafu(display("shutdown signalled"))]
    Shutdown,
}

impl From<kv_store::KvError> for CoordinatorError {
    fn from(source: kv_store::KvError) -> Self {
        let kv_store::KvError::TransientIo { source } = source;
        Self::TransientIo { source }
    }
}

impl From<log_client::LogClientError> for CoordinatorError {
    fn from(source: log_client::LogClientError) -> Self {
        use log_client::LogClientErrorKind;

        match source.kind() {
            LogClientErrorKind::BatchFailure => Self::BatchFailure {
                source: Box::new(source),
            },
            _ => Self::TransientIo {
                source: Box::new(source),
            },
        }
    }
}

impl From<upsert_segment::ConfigError> for CoordinatorError {
    fn from(source: upsert_segment::ConfigError) -> Self {
        Self::Config { source }
    }
}

impl From<upsert_segment::LookupError> for CoordinatorError {
    fn from(source: upsert_segment::LookupError) -> Self {
        Self::Lookup { source }
    }
}
