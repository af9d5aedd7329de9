//! Shared data types for the upsert coordination engine: primary keys, message contexts, and
//! the input/output event wire types exchanged between the key coordinator and the input/output
//! logs.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(missing_debug_implementations, clippy::clone_on_ref_ptr)]

use std::{fmt::Display, sync::Arc};

mod key;
pub use key::PrimaryKey;

/// A table name.
///
/// Cheaply cloneable; tables are usually shared across many events in a batch.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableName(Arc<str>);

impl TableName {
    /// Create a new [`TableName`].
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TableName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TableName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// The name of a sealed, query-side segment.
///
/// A segment name deterministically identifies exactly one output-log partition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SegmentName(Arc<str>);

impl SegmentName {
    /// Create a new [`SegmentName`].
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SegmentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SegmentName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SegmentName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// A 64-bit, non-negative offset within one input-log partition.
///
/// Monotonic per partition but not dense: gaps are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceOffset(i64);

impl SourceOffset {
    /// Create a new [`SourceOffset`] from a raw value.
    ///
    /// # Panics
    ///
    /// Panics if `value` is negative.
    pub fn new(value: i64) -> Self {
        assert!(value >= 0, "source offset must be non-negative: {value}");
        Self(value)
    }

    /// Returns the raw offset value.
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl Display for SourceOffset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which virtual column an [`OutputEvent`] addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Marks a row as newly live; the virtual column keeps the minimum value observed.
    Insert,
    /// Marks a row as superseded; the virtual column keeps the maximum value observed.
    Delete,
}

/// `(segmentName, sourceOffset, timestamp)` describing one occurrence of a primary key.
///
/// Two contexts are equal iff all three fields are equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageContext {
    /// The segment the occurrence was (or will be) written to.
    pub segment_name: SegmentName,
    /// The offset of the record that produced this occurrence in the input log.
    pub source_offset: SourceOffset,
    /// Producer-supplied timestamp used by the default conflict resolver.
    pub timestamp: i64,
}

impl MessageContext {
    /// Create a new [`MessageContext`].
    pub fn new(segment_name: SegmentName, source_offset: SourceOffset, timestamp: i64) -> Self {
        Self {
            segment_name,
            source_offset,
            timestamp,
        }
    }
}

/// One record read from the input log: a table-scoped upsert of `key` carrying `context`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputEvent {
    /// Destination table.
    pub table: TableName,
    /// Primary key of the row being upserted.
    pub key: PrimaryKey,
    /// The occurrence this event represents.
    pub context: MessageContext,
}

impl InputEvent {
    /// Create a new [`InputEvent`].
    pub fn new(table: TableName, key: PrimaryKey, context: MessageContext) -> Self {
        Self { table, key, context }
    }
}

/// One record written to the output log: an INSERT/DELETE tombstone marker addressed by the
/// source offset that produced the affected row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputEvent {
    /// Destination table.
    pub table: TableName,
    /// Destination segment; determines the output-log partition.
    pub segment_name: SegmentName,
    /// The source offset identifying the row inside `segment_name`.
    pub target_offset: SourceOffset,
    /// The supersession timestamp to record.
    pub value: i64,
    /// Which virtual column to update.
    pub kind: EventKind,
}

impl OutputEvent {
    /// Create a new [`OutputEvent`].
    pub fn new(
        table: TableName,
        segment_name: SegmentName,
        target_offset: SourceOffset,
        value: i64,
        kind: EventKind,
    ) -> Self {
        Self {
            table,
            segment_name,
            target_offset,
            value,
            kind,
        }
    }
}
