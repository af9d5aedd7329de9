use crate::{ContextStore, ContextTable, Result};
use async_trait::async_trait;
use hashbrown::HashMap;
use observability_deps::tracing::debug;
use parking_lot::RwLock;
use std::sync::Arc;
use upsert_types::{MessageContext, PrimaryKey, TableName};

/// An in-memory [`ContextStore`], backed by one hashmap per table protected with a read-write
/// mutex.
///
/// This is the in-process default: no durability, no multi-process sharing, but
/// read-your-writes within a process and a fine-grained per-table lock so unrelated tables never
/// contend.
#[derive(Debug, Default)]
pub struct MemoryContextStore {
    tables: RwLock<HashMap<TableName, Arc<MemoryContextTable>>>,
}

impl MemoryContextStore {
    /// Create an empty [`MemoryContextStore`].
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContextStore for MemoryContextStore {
    fn table(&self, table: &TableName) -> Arc<dyn ContextTable> {
        if let Some(t) = self.tables.read().get(table) {
            return Arc::clone(t) as Arc<dyn ContextTable>;
        }

        Arc::clone(
            self.tables
                .write()
                .entry(table.clone())
                .or_insert_with(|| Arc::new(MemoryContextTable::default())),
        ) as Arc<dyn ContextTable>
    }
}

/// The per-table handle returned by [`MemoryContextStore::table`].
#[derive(Debug, Default)]
pub struct MemoryContextTable {
    entries: RwLock<HashMap<PrimaryKey, MessageContext>>,
}

#[async_trait]
impl ContextTable for MemoryContextTable {
    async fn multi_get(&self, keys: &[PrimaryKey]) -> Result<HashMap<PrimaryKey, MessageContext>> {
        let entries = self.entries.read();
        Ok(keys
            .iter()
            .filter_map(|k| entries.get(k).map(|ctx| (k.clone(), ctx.clone())))
            .collect())
    }

    async fn multi_put(&self, entries: HashMap<PrimaryKey, MessageContext>) -> Result<()> {
        debug!(count = entries.len(), "multi_put to in-memory context store");
        self.entries.write().extend(entries);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use upsert_types::{SegmentName, SourceOffset};

    fn ctx(offset: i64, ts: i64) -> MessageContext {
        MessageContext::new(SegmentName::from("seg-0"), SourceOffset::new(offset), ts)
    }

    #[tokio::test]
    async fn multi_get_omits_absent_keys() {
        let store = MemoryContextStore::new();
        let table = store.table(&TableName::from("orders"));

        let got = table
            .multi_get(&[PrimaryKey::from("missing")])
            .await
            .unwrap();
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn multi_put_then_multi_get_round_trips() {
        let store = MemoryContextStore::new();
        let table = store.table(&TableName::from("orders"));

        let mut batch = HashMap::new();
        batch.insert(PrimaryKey::from("k1"), ctx(1, 100));
        batch.insert(PrimaryKey::from("k2"), ctx(2, 200));
        table.multi_put(batch.clone()).await.unwrap();

        let keys: Vec<PrimaryKey> = batch.keys().cloned().collect();
        let got = table.multi_get(&keys).await.unwrap();

        assert_eq!(got, batch);
    }

    #[tokio::test]
    async fn multi_put_overwrites_existing_context() {
        let store = MemoryContextStore::new();
        let table = store.table(&TableName::from("orders"));
        let key = PrimaryKey::from("k1");

        let mut first = HashMap::new();
        first.insert(key.clone(), ctx(1, 100));
        table.multi_put(first).await.unwrap();

        let mut second = HashMap::new();
        second.insert(key.clone(), ctx(5, 900));
        table.multi_put(second).await.unwrap();

        let got = table.multi_get(&[key.clone()]).await.unwrap();
        assert_eq!(got.get(&key).unwrap().source_offset.get(), 5);
    }

    #[tokio::test]
    async fn tables_are_independent() {
        let store = MemoryContextStore::new();
        let orders = store.table(&TableName::from("orders"));
        let users = store.table(&TableName::from("users"));

        let key = PrimaryKey::from("k1");
        let mut batch = HashMap::new();
        batch.insert(key.clone(), ctx(1, 100));
        orders.multi_put(batch).await.unwrap();

        assert!(users.multi_get(&[key]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_batches_are_accepted() {
        let store = MemoryContextStore::new();
        let table = store.table(&TableName::from("orders"));

        table.multi_put(HashMap::new()).await.unwrap();
        assert!(table.multi_get(&[]).await.unwrap().is_empty());
    }
}
