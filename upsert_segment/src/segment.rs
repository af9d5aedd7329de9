use crate::{
    error::{ConfigError, SchemaNotUpsertEnabledSnafu, SegmentError},
    index::OffsetDocIdIndex,
    update_log::{UpdateLogEntry, UpdateLogStore},
    virtual_column::VirtualColumnWriter,
    watermark::WatermarkManager,
};
use hashbrown::HashMap;
use observability_deps::tracing::debug;
use snafu::ensure;
use std::sync::Arc;
use upsert_types::{SegmentName, SourceOffset, TableName};

/// Construction-time description of a segment: its metadata, the offset column used to build
/// the offset→docId index, the virtual columns it exposes, and whether its schema is
/// upsert-enabled.
#[derive(Debug)]
pub struct SegmentConfig {
    /// Destination table this segment belongs to.
    pub table: TableName,
    /// This segment's name; determines its output-log partition.
    pub segment_name: SegmentName,
    /// Total row count of the sealed segment.
    pub total_docs: usize,
    /// `(sourceOffset, docId)` pairs read from the segment's offset column.
    pub offset_column: Vec<(i64, i32)>,
    /// Names of the mutable virtual columns this segment exposes (e.g. `valid_from`,
    /// `valid_until`).
    pub virtual_columns: Vec<String>,
    /// Whether the segment's schema is flagged for upsert. Missing this is a construction-time
    /// error.
    pub upsert_enabled: bool,
}

/// The query-side receiver of tombstone/insert events.
///
/// Binds the offset index, the virtual column writers, and the shared watermark manager;
/// replays durable history from the update log on open and then accepts streaming updates.
#[derive(Debug)]
pub struct UpsertSegment {
    table: TableName,
    segment_name: SegmentName,
    index: OffsetDocIdIndex,
    writers: HashMap<String, VirtualColumnWriter>,
    watermark: Arc<WatermarkManager>,
    update_log: Arc<dyn UpdateLogStore>,
}

impl UpsertSegment {
    /// Open a segment: validate its schema, build the offset index, and register its virtual
    /// column writers. Does not yet apply historical updates — call [`Self::init_virtual_column`]
    /// for that.
    pub fn open(
        config: SegmentConfig,
        watermark: Arc<WatermarkManager>,
        update_log: Arc<dyn UpdateLogStore>,
    ) -> Result<Self, ConfigError> {
        ensure!(config.upsert_enabled, SchemaNotUpsertEnabledSnafu);

        let index = OffsetDocIdIndex::build(config.offset_column, config.total_docs)?;

        let writers = config
            .virtual_columns
            .into_iter()
            .map(|name| {
                let writer = VirtualColumnWriter::new(name.clone(), config.total_docs);
                (name, writer)
            })
            .collect();

        Ok(Self {
            table: config.table,
            segment_name: config.segment_name,
            index,
            writers,
            watermark,
            update_log,
        })
    }

    /// This segment's table.
    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// This segment's name.
    pub fn segment_name(&self) -> &SegmentName {
        &self.segment_name
    }

    /// The current value of virtual column `name` at `doc_id`, or `None` if no such column is
    /// registered.
    pub fn column_value(&self, name: &str, doc_id: i32) -> Option<i64> {
        self.writers.get(name).map(|w| w.get(doc_id))
    }

    /// Bulk-replay durable update-log history.
    ///
    /// Fetches every entry for this `(table, segment)` from the update log, groups by source
    /// offset, and for each populated index slot applies every entry in the group to every
    /// writer. If any writer's state changed, the *last* entry of the group is forwarded to the
    /// watermark manager — grouping collapses redundant churn, and per-entry watermark updates
    /// would be `O(entries)` with no benefit since the watermark is monotonic.
    ///
    /// Entries whose offset has no row in this segment (index slot `-1`) are silently dropped,
    /// matching the invariant that replay only ever walks the offset index's own populated
    /// slots.
    pub async fn init_virtual_column(&self) -> Result<(), SegmentError> {
        let entries = self.update_log.get_all(&self.table, &self.segment_name).await?;

        let mut groups: HashMap<i64, Vec<UpdateLogEntry>> = HashMap::new();
        for entry in entries {
            groups
                .entry(entry.source_offset.get())
                .or_default()
                .push(entry);
        }

        for (offset, group) in groups {
            let doc_id = match self.index.doc_id_of(offset) {
                Ok(doc_id) => doc_id,
                Err(_) => {
                    debug!(offset, "replay: offset has no row in this segment, dropping");
                    continue;
                }
            };

            let mut changed = false;
            for entry in &group {
                for writer in self.writers.values() {
                    if writer.update(doc_id, entry.value, entry.kind) {
                        changed = true;
                    }
                }
            }

            if changed {
                if let Some(last) = group.last() {
                    self.watermark
                        .process_message(&self.table, &self.segment_name, last.source_offset);
                }
            }
        }

        Ok(())
    }

    /// Apply a batch of streaming updates.
    ///
    /// Each entry resolves to a row via the offset index; if any writer changed state, the
    /// entry is forwarded to the watermark manager. Entries are processed best-effort: an
    /// unresolvable offset does not stop the remaining entries in `entries` from being applied,
    /// but the first [`SegmentError`] encountered is returned once the whole batch has been
    /// attempted.
    pub async fn update_virtual_column(
        &self,
        entries: impl IntoIterator<Item = UpdateLogEntry>,
    ) -> Result<(), SegmentError> {
        let mut first_error = None;

        for entry in entries {
            let doc_id = match self.index.doc_id_of(entry.source_offset.get()) {
                Ok(doc_id) => doc_id,
                Err(e) => {
                    first_error.get_or_insert(SegmentError::from(e));
                    continue;
                }
            };

            let mut changed = false;
            for writer in self.writers.values() {
                if writer.update(doc_id, entry.value, entry.kind) {
                    changed = true;
                }
            }

            if changed {
                self.watermark
                    .process_message(&self.table, &self.segment_name, entry.source_offset);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// The current watermark for this segment, or `None` if no update has applied yet.
    pub fn watermark(&self) -> Option<i64> {
        self.watermark.watermark(&self.table, &self.segment_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use crate::update_log::MemoryUpdateLogStore;
    use upsert_types::EventKind;

    fn config(upsert_enabled: bool) -> SegmentConfig {
        SegmentConfig {
            table: TableName::from("orders"),
            segment_name: SegmentName::from("s1"),
            total_docs: 3,
            offset_column: vec![(100, 0), (102, 1), (105, 2)],
            virtual_columns: vec!["valid_from".to_string(), "valid_until".to_string()],
            upsert_enabled,
        }
    }

    #[test]
    fn open_rejects_a_schema_that_is_not_upsert_enabled() {
        let err = UpsertSegment::open(
            config(false),
            Arc::new(WatermarkManager::new()),
            Arc::new(MemoryUpdateLogStore::new()),
        )
        .unwrap_err();
        assert_matches!(err, ConfigError::SchemaNotUpsertEnabled);
    }

    #[tokio::test]
    async fn replay_applies_grouped_history_and_drops_unmatched_offsets() {
        let update_log = Arc::new(MemoryUpdateLogStore::new());
        let table = TableName::from("orders");
        let segment_name = SegmentName::from("s1");

        update_log
            .append(
                &table,
                &segment_name,
                UpdateLogEntry::new(SourceOffset::new(100), 7, EventKind::Insert),
            )
            .await
            .unwrap();
        update_log
            .append(
                &table,
                &segment_name,
                UpdateLogEntry::new(SourceOffset::new(105), 9, EventKind::Delete),
            )
            .await
            .unwrap();
        update_log
            .append(
                &table,
                &segment_name,
                UpdateLogEntry::new(SourceOffset::new(101), 1, EventKind::Insert),
            )
            .await
            .unwrap();

        let watermark = Arc::new(WatermarkManager::new());
        let segment = UpsertSegment::open(config(true), Arc::clone(&watermark), update_log).unwrap();
        segment.init_virtual_column().await.unwrap();

        assert_eq!(segment.column_value("valid_from", 0), Some(7));
        assert_eq!(segment.column_value("valid_until", 2), Some(9));
        // offset 101 has no row (slot = -1): silently dropped.
        assert_eq!(segment.column_value("valid_from", 1), Some(0));
        assert_eq!(segment.watermark(), Some(105));
    }

    #[tokio::test]
    async fn streaming_update_resolves_through_the_offset_index() {
        let watermark = Arc::new(WatermarkManager::new());
        let update_log = Arc::new(MemoryUpdateLogStore::new());
        let segment = UpsertSegment::open(config(true), Arc::clone(&watermark), update_log).unwrap();

        segment
            .update_virtual_column([UpdateLogEntry::new(
                SourceOffset::new(100),
                42,
                EventKind::Insert,
            )])
            .await
            .unwrap();

        assert_eq!(segment.column_value("valid_from", 0), Some(42));
        assert_eq!(segment.watermark(), Some(100));
    }

    #[tokio::test]
    async fn streaming_update_is_best_effort_across_a_batch() {
        let watermark = Arc::new(WatermarkManager::new());
        let update_log = Arc::new(MemoryUpdateLogStore::new());
        let segment = UpsertSegment::open(config(true), Arc::clone(&watermark), update_log).unwrap();

        let err = segment
            .update_virtual_column([
                UpdateLogEntry::new(SourceOffset::new(999), 1, EventKind::Insert),
                UpdateLogEntry::new(SourceOffset::new(100), 42, EventKind::Insert),
            ])
            .await
            .unwrap_err();

        assert_matches!(err, SegmentError::Lookup { .. });
        // The resolvable entry in the same call still applied.
        assert_eq!(segment.column_value("valid_from", 0), Some(42));
    }

    #[tokio::test]
    async fn repeated_replay_is_idempotent() {
        // Applying the same update log to a segment twice produces the same virtual-column
        // state as applying it once.
        let update_log = Arc::new(MemoryUpdateLogStore::new());
        let table = TableName::from("orders");
        let segment_name = SegmentName::from("s1");
        update_log
            .append(
                &table,
                &segment_name,
                UpdateLogEntry::new(SourceOffset::new(100), 7, EventKind::Insert),
            )
            .await
            .unwrap();

        let watermark = Arc::new(WatermarkManager::new());
        let segment =
            UpsertSegment::open(config(true), Arc::clone(&watermark), Arc::clone(&update_log))
                .unwrap();

        segment.init_virtual_column().await.unwrap();
        let after_first = segment.column_value("valid_from", 0);
        segment.init_virtual_column().await.unwrap();
        let after_second = segment.column_value("valid_from", 0);

        assert_eq!(after_first, after_second);
    }
}
