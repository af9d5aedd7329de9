//! The key-to-context store contract.
//!
//! This crate owns the *contract* only: the embedded engine that actually durably persists the
//! mapping is an out-of-scope external collaborator. [`MemoryContextStore`] is the in-memory
//! test double / in-process default.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(missing_debug_implementations, clippy::clone_on_ref_ptr)]

mod memory;

pub use memory::MemoryContextStore;

use async_trait::async_trait;
use hashbrown::HashMap;
use snafu::Snafu;
use std::fmt::Debug;
use upsert_types::{MessageContext, PrimaryKey, TableName};

/// Errors surfaced by a [`ContextStore`] / [`ContextTable`] implementation.
///
/// Any failure here is fatal to the current processing batch: the caller must not advance
/// input-log offsets or treat the in-memory overlay as committed.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum KvError {
    /// A transient I/O failure talking to the backing engine.
    #[snafu(display("transient I/O error reading/writing key-context store: {source}"))]
    TransientIo {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result alias for [`KvError`].
pub type Result<T, E = KvError> = std::result::Result<T, E>;

/// A durable, namespaced mapping from [`PrimaryKey`] to the current-winning [`MessageContext`].
///
/// Implementations must guarantee that a [`ContextTable::multi_put`] which returns `Ok` is
/// observable by any subsequent [`ContextTable::multi_get`] (read-your-writes).
#[async_trait]
pub trait ContextTable: Debug + Send + Sync {
    /// Fetch the current context for each of `keys`. Keys with no stored context are omitted
    /// from the result.
    async fn multi_get(
        &self,
        keys: &[PrimaryKey],
    ) -> Result<HashMap<PrimaryKey, MessageContext>>;

    /// Atomically overwrite the context for every key in `entries`.
    async fn multi_put(&self, entries: HashMap<PrimaryKey, MessageContext>) -> Result<()>;
}

/// A key-to-context store, namespaced by table.
pub trait ContextStore: Debug + Send + Sync {
    /// Returns the namespaced handle for `table`. Tables are independent: keys in one table
    /// never collide with keys in another.
    fn table(&self, table: &TableName) -> std::sync::Arc<dyn ContextTable>;
}
