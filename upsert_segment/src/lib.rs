//! The immutable upsert segment: the query-side receiver of tombstone/insert events.
//!
//! Binds the offset→docId index, the virtual column writers, the process-wide watermark
//! manager, the segment lifecycle, and the update log store contract.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(missing_debug_implementations, clippy::clone_on_ref_ptr)]

pub mod error;
pub mod index;
pub mod segment;
pub mod update_log;
pub mod virtual_column;
pub mod watermark;

pub use error::{ConfigError, LookupError, SegmentError, UpdateLogError};
pub use index::OffsetDocIdIndex;
pub use segment::{SegmentConfig, UpsertSegment};
pub use update_log::{MemoryUpdateLogStore, UpdateLogEntry, UpdateLogStore};
pub use virtual_column::VirtualColumnWriter;
pub use watermark::WatermarkManager;
