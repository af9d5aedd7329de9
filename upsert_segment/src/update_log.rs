use crate::error::UpdateLogError;
use async_trait::async_trait;
use hashbrown::HashMap;
use parking_lot::RwLock;
use std::fmt::Debug;
use upsert_types::{EventKind, SegmentName, SourceOffset, TableName};

/// One durable update-log record: `(sourceOffset, value, kind)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateLogEntry {
    /// The source offset the update applies to.
    pub source_offset: SourceOffset,
    /// The supersession timestamp carried by the update.
    pub value: i64,
    /// Which virtual column kind the update targets.
    pub kind: EventKind,
}

impl UpdateLogEntry {
    /// Construct a new [`UpdateLogEntry`].
    pub fn new(source_offset: SourceOffset, value: i64, kind: EventKind) -> Self {
        Self {
            source_offset,
            value,
            kind,
        }
    }
}

/// Append-only durable storage for per-`(table, segment)` update logs.
///
/// The only operation required at segment-open time is a full scan; there is no ordering
/// guarantee within a single `sourceOffset` because virtual-column idempotence absorbs any
/// reordering.
#[async_trait]
pub trait UpdateLogStore: Debug + Send + Sync {
    /// Durably append `entry` for `(table, segment)`. Visible to subsequent [`get_all`](Self::get_all)
    /// once this returns `Ok`.
    async fn append(
        &self,
        table: &TableName,
        segment: &SegmentName,
        entry: UpdateLogEntry,
    ) -> Result<(), UpdateLogError>;

    /// Fetch every entry ever appended for `(table, segment)`, in append order.
    async fn get_all(
        &self,
        table: &TableName,
        segment: &SegmentName,
    ) -> Result<Vec<UpdateLogEntry>, UpdateLogError>;
}

/// An in-memory [`UpdateLogStore`], backed by one append-only vector per `(table, segment)`.
#[derive(Debug, Default)]
pub struct MemoryUpdateLogStore {
    logs: RwLock<HashMap<(TableName, SegmentName), Vec<UpdateLogEntry>>>,
}

impl MemoryUpdateLogStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UpdateLogStore for MemoryUpdateLogStore {
    async fn append(
        &self,
        table: &TableName,
        segment: &SegmentName,
        entry: UpdateLogEntry,
    ) -> Result<(), UpdateLogError> {
        self.logs
            .write()
            .entry((table.clone(), segment.clone()))
            .or_default()
            .push(entry);
        Ok(())
    }

    async fn get_all(
        &self,
        table: &TableName,
        segment: &SegmentName,
    ) -> Result<Vec<UpdateLogEntry>, UpdateLogError> {
        Ok(self
            .logs
            .read()
            .get(&(table.clone(), segment.clone()))
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> (TableName, SegmentName) {
        (TableName::from("orders"), SegmentName::from("s1"))
    }

    #[tokio::test]
    async fn get_all_is_empty_for_an_unknown_segment() {
        let store = MemoryUpdateLogStore::new();
        let (table, segment) = key();
        assert!(store.get_all(&table, &segment).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_is_visible_to_a_subsequent_get_all() {
        let store = MemoryUpdateLogStore::new();
        let (table, segment) = key();
        let entry = UpdateLogEntry::new(SourceOffset::new(100), 7, EventKind::Insert);

        store.append(&table, &segment, entry).await.unwrap();
        let all = store.get_all(&table, &segment).await.unwrap();
        assert_eq!(all, vec![entry]);
    }

    #[tokio::test]
    async fn segments_are_independent() {
        let store = MemoryUpdateLogStore::new();
        let (table, _) = key();
        let s1 = SegmentName::from("s1");
        let s2 = SegmentName::from("s2");

        store
            .append(
                &table,
                &s1,
                UpdateLogEntry::new(SourceOffset::new(1), 1, EventKind::Insert),
            )
            .await
            .unwrap();

        assert!(store.get_all(&table, &s2).await.unwrap().is_empty());
    }
}
