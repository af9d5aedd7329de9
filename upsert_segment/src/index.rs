use crate::error::{
    ConfigError, DocIdOutOfRangeSnafu, DuplicateDocIdSnafu, LookupError, NotFoundSnafu,
    OutOfRangeSnafu,
};
use snafu::OptionExt;

/// A dense, read-only mapping from source-log offset to local row id, built once when a segment
/// is opened.
///
/// Source offsets within one segment are near-dense, so a flat array beats a hash map on both
/// memory and cache locality; the sparse holes cost one `i32` per missing offset.
#[derive(Debug)]
pub struct OffsetDocIdIndex {
    min_offset: i64,
    offset_to_doc_id: Vec<i32>,
}

impl OffsetDocIdIndex {
    /// Build the index from `(sourceOffset, docId)` pairs observed by scanning a segment's
    /// offset column once.
    ///
    /// `total_docs` is the segment's declared row count; every `docId` must fall in
    /// `[0, total_docs)` and appear at most once, or this returns a [`ConfigError`].
    pub fn build(
        pairs: impl IntoIterator<Item = (i64, i32)>,
        total_docs: usize,
    ) -> Result<Self, ConfigError> {
        let pairs: Vec<(i64, i32)> = pairs.into_iter().collect();

        if pairs.is_empty() {
            return Ok(Self {
                min_offset: 0,
                offset_to_doc_id: Vec::new(),
            });
        }

        let min_offset = pairs.iter().map(|(offset, _)| *offset).min().unwrap();
        let max_offset = pairs.iter().map(|(offset, _)| *offset).max().unwrap();
        let len = (max_offset - min_offset + 1) as usize;

        let mut offset_to_doc_id = vec![-1i32; len];
        for (offset, doc_id) in pairs {
            snafu::ensure!(
                doc_id >= 0 && (doc_id as usize) < total_docs,
                DocIdOutOfRangeSnafu { doc_id, total_docs }
            );

            let slot = &mut offset_to_doc_id[(offset - min_offset) as usize];
            snafu::ensure!(*slot == -1, DuplicateDocIdSnafu { doc_id });
            *slot = doc_id;
        }

        Ok(Self {
            min_offset,
            offset_to_doc_id,
        })
    }

    /// Resolve `offset` to the row id that holds it.
    pub fn doc_id_of(&self, offset: i64) -> Result<i32, LookupError> {
        if offset < self.min_offset {
            return OutOfRangeSnafu { offset }.fail();
        }
        let idx = (offset - self.min_offset) as usize;
        let doc_id = *self
            .offset_to_doc_id
            .get(idx)
            .context(OutOfRangeSnafu { offset })?;

        if doc_id < 0 {
            return NotFoundSnafu { offset }.fail();
        }
        Ok(doc_id)
    }

    /// The lowest source offset this index was built from.
    pub fn min_offset(&self) -> i64 {
        self.min_offset
    }

    /// The number of distinct slots (populated or not) this index covers.
    pub fn len(&self) -> usize {
        self.offset_to_doc_id.len()
    }

    /// Whether this index covers zero slots.
    pub fn is_empty(&self) -> bool {
        self.offset_to_doc_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn replay_drops_offsets_with_no_associated_row_while_resolving_known_offsets() {
        // Segment s1 has offsets {100, 102, 105} -> docIds {0, 1, 2}, minOffset=100, array
        // length 6.
        let index = OffsetDocIdIndex::build([(100, 0), (102, 1), (105, 2)], 3).unwrap();

        assert_eq!(index.min_offset(), 100);
        assert_eq!(index.len(), 6);

        assert_eq!(index.doc_id_of(100).unwrap(), 0);
        assert_eq!(index.doc_id_of(102).unwrap(), 1);
        assert_eq!(index.doc_id_of(105).unwrap(), 2);

        // offset 101 has no row: NotFound, not an error that should ever bubble out of replay.
        assert_matches!(index.doc_id_of(101), Err(LookupError::NotFound { offset: 101 }));
    }

    #[test]
    fn rejects_offsets_outside_the_built_range() {
        let index = OffsetDocIdIndex::build([(100, 0), (105, 1)], 2).unwrap();

        assert_matches!(index.doc_id_of(99), Err(LookupError::OutOfRange { offset: 99 }));
        assert_matches!(index.doc_id_of(106), Err(LookupError::OutOfRange { offset: 106 }));
    }

    #[test]
    fn doc_id_of_round_trips_through_build() {
        let index = OffsetDocIdIndex::build([(10, 0), (11, 1), (12, 2), (20, 3)], 4).unwrap();
        for (offset, expected_doc_id) in [(10, 0), (11, 1), (12, 2), (20, 3)] {
            assert_eq!(index.doc_id_of(offset).unwrap(), expected_doc_id);
        }
    }

    #[test]
    fn rejects_duplicate_doc_ids() {
        let err = OffsetDocIdIndex::build([(10, 0), (11, 0)], 1).unwrap_err();
        assert_matches!(err, ConfigError::DuplicateDocId { doc_id: 0 });
    }

    #[test]
    fn rejects_doc_ids_outside_total_docs() {
        let err = OffsetDocIdIndex::build([(10, 5)], 2).unwrap_err();
        assert_matches!(
            err,
            ConfigError::DocIdOutOfRange {
                doc_id: 5,
                total_docs: 2
            }
        );
    }

    #[test]
    fn an_empty_offset_column_builds_an_empty_index() {
        let index = OffsetDocIdIndex::build(std::iter::empty(), 0).unwrap();
        assert!(index.is_empty());
        assert_matches!(index.doc_id_of(0), Err(LookupError::OutOfRange { offset: 0 }));
    }
}
