use parking_lot::RwLock;
use upsert_types::EventKind;

/// One row's state within a [`VirtualColumnWriter`]: the shared stored value, plus independent
/// presence bits per [`EventKind`].
#[derive(Debug, Clone, Copy, Default)]
struct RowState {
    value: i64,
    insert_present: bool,
    delete_present: bool,
}

/// A mutable int64 column overlaid on an otherwise immutable segment.
///
/// `update` is idempotent per `(row, value, kind)`: replaying the same update log twice leaves
/// the column unchanged after the first pass.
#[derive(Debug)]
pub struct VirtualColumnWriter {
    name: String,
    rows: RwLock<Vec<RowState>>,
}

impl VirtualColumnWriter {
    /// Create a writer for a column of `total_docs` rows, all initially unset.
    pub fn new(name: impl Into<String>, total_docs: usize) -> Self {
        Self {
            name: name.into(),
            rows: RwLock::new(vec![RowState::default(); total_docs]),
        }
    }

    /// The column's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The column's current value at `doc_id`.
    ///
    /// Returns `0` if no update has ever touched this row; callers that need to distinguish
    /// "never written" from "written with value 0" should track that separately (the segment's
    /// watermark or its own presence bookkeeping).
    pub fn get(&self, doc_id: i32) -> i64 {
        self.rows.read()[doc_id as usize].value
    }

    /// Apply an update of `kind` with `value` at `doc_id`.
    ///
    /// Policy: if no prior value of `kind` is present at `doc_id`, store it unconditionally.
    /// Otherwise compare against the stored value using kind-specific monotonicity (`Insert`
    /// keeps the minimum observed, `Delete` keeps the maximum) and only write if it changed.
    ///
    /// Returns whether the column's state changed.
    pub fn update(&self, doc_id: i32, value: i64, kind: EventKind) -> bool {
        let mut rows = self.rows.write();
        let row = &mut rows[doc_id as usize];

        let present = match kind {
            EventKind::Insert => &mut row.insert_present,
            EventKind::Delete => &mut row.delete_present,
        };

        if !*present {
            *present = true;
            row.value = value;
            return true;
        }

        let candidate = match kind {
            EventKind::Insert => row.value.min(value),
            EventKind::Delete => row.value.max(value),
        };

        if candidate != row.value {
            row.value = candidate;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_update_of_a_kind_is_unconditional() {
        let writer = VirtualColumnWriter::new("valid_from", 1);
        assert!(writer.update(0, 42, EventKind::Insert));
        assert_eq!(writer.get(0), 42);
    }

    #[test]
    fn insert_keeps_the_minimum_observed() {
        let writer = VirtualColumnWriter::new("valid_from", 1);
        writer.update(0, 100, EventKind::Insert);
        assert!(writer.update(0, 50, EventKind::Insert));
        assert_eq!(writer.get(0), 50);
        assert!(!writer.update(0, 75, EventKind::Insert));
        assert_eq!(writer.get(0), 50);
    }

    #[test]
    fn delete_keeps_the_maximum_observed() {
        let writer = VirtualColumnWriter::new("valid_until", 1);
        writer.update(0, 100, EventKind::Delete);
        assert!(writer.update(0, 150, EventKind::Delete));
        assert_eq!(writer.get(0), 150);
        assert!(!writer.update(0, 120, EventKind::Delete));
        assert_eq!(writer.get(0), 150);
    }

    #[test]
    fn repeated_identical_updates_are_idempotent() {
        // Applying the same update twice yields `false` the second time.
        let writer = VirtualColumnWriter::new("valid_from", 1);
        assert!(writer.update(0, 10, EventKind::Insert));
        assert!(!writer.update(0, 10, EventKind::Insert));
        assert_eq!(writer.get(0), 10);
    }

    #[test]
    fn rows_are_independent() {
        let writer = VirtualColumnWriter::new("valid_from", 2);
        writer.update(0, 10, EventKind::Insert);
        assert_eq!(writer.get(1), 0);
    }
}
