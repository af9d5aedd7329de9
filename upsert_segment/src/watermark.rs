use hashbrown::HashMap;
use parking_lot::RwLock;
use upsert_types::{SegmentName, SourceOffset, TableName};

/// Process-wide registry of the highest observed source offset per `(table, segment)`.
///
/// Treated as an explicit, injected collaborator rather than ambient global state: callers
/// construct one and share it via `Arc`, which also makes it straightforward to substitute in
/// tests.
#[derive(Debug, Default)]
pub struct WatermarkManager {
    watermarks: RwLock<HashMap<(TableName, SegmentName), i64>>,
}

impl WatermarkManager {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `offset` has been applied for `(table, segment)`.
    ///
    /// The stored watermark only ever moves forward: `process_message` is a monotonic max,
    /// safe to call with out-of-order offsets or to call redundantly during replay.
    pub fn process_message(&self, table: &TableName, segment: &SegmentName, offset: SourceOffset) {
        let key = (table.clone(), segment.clone());
        let mut watermarks = self.watermarks.write();
        let entry = watermarks.entry(key).or_insert(i64::MIN);
        *entry = (*entry).max(offset.get());
    }

    /// The current watermark for `(table, segment)`, or `None` if no update has ever been
    /// applied to it.
    pub fn watermark(&self, table: &TableName, segment: &SegmentName) -> Option<i64> {
        self.watermarks
            .read()
            .get(&(table.clone(), segment.clone()))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> (TableName, SegmentName) {
        (TableName::from("orders"), SegmentName::from("s1"))
    }

    #[test]
    fn absent_watermark_is_none() {
        let manager = WatermarkManager::new();
        let (table, segment) = key();
        assert_eq!(manager.watermark(&table, &segment), None);
    }

    #[test]
    fn watermark_is_monotonic_across_out_of_order_updates() {
        // Apply events at offsets [50, 30, 70, 60] in that order; after each, watermark =
        // 50, 50, 70, 70.
        let manager = WatermarkManager::new();
        let (table, segment) = key();

        let expected = [(50, 50), (30, 50), (70, 70), (60, 70)];
        for (offset, want) in expected {
            manager.process_message(&table, &segment, SourceOffset::new(offset));
            assert_eq!(manager.watermark(&table, &segment), Some(want));
        }
    }

    #[test]
    fn tables_and_segments_are_independent() {
        let manager = WatermarkManager::new();
        manager.process_message(
            &TableName::from("orders"),
            &SegmentName::from("s1"),
            SourceOffset::new(10),
        );
        assert_eq!(
            manager.watermark(&TableName::from("orders"), &SegmentName::from("s2")),
            None
        );
        assert_eq!(
            manager.watermark(&TableName::from("users"), &SegmentName::from("s1")),
            None
        );
    }
}
