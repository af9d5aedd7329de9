use snafu::Snafu;

/// Construction-time failures for an [`crate::segment::UpsertSegment`].
///
/// All of these are fatal: the caller should surface and refuse to start rather than retry.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// The segment's schema was not flagged as upsert-enabled at construction time.
    #[snafu(display("segment schema is not flagged for upsert"))]
    SchemaNotUpsertEnabled,

    /// The same `docId` was observed at more than one source offset, violating the index's
    /// injectivity requirement.
    #[snafu(display("docId {doc_id} appears more than once in the offset column"))]
    DuplicateDocId { doc_id: i32 },

    /// A `docId` produced by the offset column falls outside `[0, total_docs)`.
    #[snafu(display("docId {doc_id} is out of range for total_docs={total_docs}"))]
    DocIdOutOfRange { doc_id: i32, total_docs: usize },
}

/// Lookup failures raised by the offset→docId index.
#[derive(Debug, Snafu, Clone, Copy, PartialEq, Eq)]
#[snafu(visibility(pub))]
pub enum LookupError {
    /// `offset` falls outside the index's `[minOffset, minOffset + len)` range.
    #[snafu(display("offset {offset} is out of range"))]
    OutOfRange { offset: i64 },

    /// `offset` is within range but no row was ever observed at that offset.
    #[snafu(display("offset {offset} has no associated row"))]
    NotFound { offset: i64 },
}

/// Failures surfaced while reading from or writing to the durable update log.
///
/// Classified as `TransientIO`: callers should treat these as retriable and must not advance
/// any commit state on receipt.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum UpdateLogError {
    /// A transient I/O failure reading or writing the update log.
    #[snafu(display("transient I/O error in update log store: {source}"))]
    TransientIo {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Failures surfaced while applying updates to a live [`crate::segment::UpsertSegment`].
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SegmentError {
    /// The offset named by an incoming event could not be resolved to a row in this segment.
    /// Fatal for that event; the segment's contract is that any offset delivered to it must be
    /// a row it holds.
    #[snafu(display("{source}"))]
    Lookup { source: LookupError },

    /// A durable read against the update log store failed while replaying history.
    #[snafu(display("{source}"))]
    UpdateLog { source: UpdateLogError },
}

impl From<LookupError> for SegmentError {
    fn from(source: LookupError) -> Self {
        Self::Lookup { source }
    }
}

impl From<UpdateLogError> for SegmentError {
    fn from(source: UpdateLogError) -> Self {
        Self::UpdateLog { source }
    }
}
