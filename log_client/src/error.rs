use std::fmt::{Display, Formatter};

/// Generic boxed error type used throughout this crate.
///
/// The dynamic boxing makes it easier to deal with errors from different broker
/// implementations without threading their error types through every trait signature.
#[derive(Debug)]
pub struct LogClientError {
    inner: Box<dyn std::error::Error + Sync + Send>,
    kind: LogClientErrorKind,
}

impl LogClientError {
    /// Construct an error of the given `kind` wrapping `e`.
    pub fn new(kind: LogClientErrorKind, e: impl Into<Box<dyn std::error::Error + Sync + Send>>) -> Self {
        Self {
            inner: e.into(),
            kind,
        }
    }

    /// Returns the kind of error this was.
    pub fn kind(&self) -> LogClientErrorKind {
        self.kind
    }

    /// Returns the inner error.
    pub fn inner(&self) -> &dyn std::error::Error {
        self.inner.as_ref()
    }
}

impl Display for LogClientError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "LogClientError({:?}): {}", self.kind, self.inner)
    }
}

impl std::error::Error for LogClientError {}

impl From<&'static str> for LogClientError {
    fn from(e: &'static str) -> Self {
        Self {
            inner: e.into(),
            kind: LogClientErrorKind::Unknown,
        }
    }
}

impl From<String> for LogClientError {
    fn from(e: String) -> Self {
        Self {
            inner: e.into(),
            kind: LogClientErrorKind::Unknown,
        }
    }
}

/// The kind of [`LogClientError`] that occurred.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LogClientErrorKind {
    /// Unclassified failure.
    Unknown,

    /// The caller supplied invalid input (e.g. an unknown partition id).
    InvalidInput,

    /// A transient failure talking to the broker. Callers should treat this as retriable:
    /// abort the batch, do not commit offsets, retry next cycle.
    TransientIo,

    /// The output producer's completion deadline was exceeded, or a subset of a batch failed.
    /// Callers should treat this identically to `TransientIo`.
    BatchFailure,
}
