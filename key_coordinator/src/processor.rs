use crate::{config::ProcessingConfig, error::CoordinatorError, lifecycle::ShutdownHandle, resolver::ConflictResolver};
use hashbrown::{HashMap, HashSet};
use iox_time::TimeProvider;
use kv_store::ContextStore;
use log_client::{InputLogReading, InputRecord, OutputLogWriting};
use observability_deps::tracing::{debug, warn};
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;
use upsert_types::{EventKind, MessageContext, OutputEvent, PrimaryKey, SourceOffset, TableName};

/// A drained batch of input records, plus the per-partition maximum offset observed while
/// draining (the commit set).
struct Batch {
    records: Vec<InputRecord>,
    max_offset_per_partition: HashMap<i32, i64>,
}

impl Batch {
    fn from_records(records: Vec<InputRecord>) -> Self {
        let mut max_offset_per_partition: HashMap<i32, i64> = HashMap::new();
        for record in &records {
            let entry = max_offset_per_partition
                .entry(record.partition)
                .or_insert(record.offset.get());
            *entry = (*entry).max(record.offset.get());
        }
        Self {
            records,
            max_offset_per_partition,
        }
    }
}

/// Single-consumer loop that drains the hand-off queue into size/time-bounded batches,
/// resolves conflicts per table, emits output events, and commits input offsets only after a
/// successful output-produce and key→context write.
pub async fn run(
    mut queue_rx: mpsc::Receiver<InputRecord>,
    input_reader: Arc<dyn InputLogReading>,
    kv_store: Arc<dyn ContextStore>,
    resolver: Arc<dyn ConflictResolver>,
    output: Arc<dyn OutputLogWriting>,
    shutdown: Arc<ShutdownHandle>,
    config: ProcessingConfig,
    time_provider: Arc<dyn TimeProvider>,
) {
    loop {
        if shutdown.is_cancelled() && queue_rx.is_empty() {
            debug!("processing loop shutting down");
            return;
        }

        let batch = assemble_batch(&mut queue_rx, &config, &shutdown, time_provider.as_ref()).await;
        if batch.records.is_empty() {
            if shutdown.is_cancelled() {
                debug!("processing loop shutting down after draining an empty batch");
                return;
            }
            continue;
        }

        let n = batch.records.len();
        match process_batch(
            &batch,
            input_reader.as_ref(),
            kv_store.as_ref(),
            resolver.as_ref(),
            output.as_ref(),
            config.output_ack_timeout(),
        )
        .await
        {
            Ok(()) => debug!(batch_size = n, "committed batch"),
            Err(e) => warn!(
                %e,
                batch_size = n,
                "batch processing failed, input offsets not committed, will retry next cycle"
            ),
        }
    }
}

/// Batch assembly: drain up to `fetch_msg_max_batch_size` records, or until
/// `fetch_msg_max_delay` has elapsed, sleeping `fetch_msg_delay` between drain attempts.
async fn assemble_batch(
    queue_rx: &mut mpsc::Receiver<InputRecord>,
    config: &ProcessingConfig,
    shutdown: &ShutdownHandle,
    time_provider: &dyn TimeProvider,
) -> Batch {
    let mut records = Vec::new();
    let deadline = time_provider.now() + config.fetch_msg_max_delay();

    loop {
        while records.len() < config.fetch_msg_max_batch_size() {
            match queue_rx.try_recv() {
                Ok(record) => records.push(record),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    return Batch::from_records(records)
                }
            }
        }

        if records.len() >= config.fetch_msg_max_batch_size()
            || time_provider.now() >= deadline
            || shutdown.is_cancelled()
        {
            return Batch::from_records(records);
        }

        tokio::select! {
            _ = tokio::time::sleep(config.fetch_msg_delay()) => {}
            _ = shutdown.cancelled() => {}
        }
    }
}

async fn process_batch(
    batch: &Batch,
    input_reader: &dyn InputLogReading,
    kv_store: &dyn ContextStore,
    resolver: &dyn ConflictResolver,
    output: &dyn OutputLogWriting,
    ack_timeout: Duration,
) -> Result<(), CoordinatorError> {
    let mut grouped: HashMap<TableName, Vec<&upsert_types::InputEvent>> = HashMap::new();
    for record in &batch.records {
        grouped
            .entry(record.event.table.clone())
            .or_default()
            .push(&record.event);
    }

    let mut output_events = Vec::new();
    let mut overlays: HashMap<TableName, HashMap<PrimaryKey, MessageContext>> = HashMap::new();

    for (table, messages) in &grouped {
        let table_handle = kv_store.table(table);

        let mut distinct_keys = Vec::new();
        let mut seen = HashSet::new();
        for msg in messages {
            if seen.insert(msg.key.clone()) {
                distinct_keys.push(msg.key.clone());
            }
        }

        let mut overlay = table_handle.multi_get(&distinct_keys).await?;

        for msg in messages {
            let new = &msg.context;
            let key = &msg.key;

            match overlay.get(key).cloned() {
                None => {
                    overlay.insert(key.clone(), new.clone());
                    output_events.push(insert_event(table, new));
                }
                Some(old) if &old == new => {
                    debug!(?key, "duplicate input, same replica, skipping");
                }
                Some(old) if resolver.should_delete_first(&old, new) => {
                    output_events.push(delete_event(table, &old, new));
                    overlay.insert(key.clone(), new.clone());
                    output_events.push(insert_event(table, new));
                }
                Some(old) => {
                    if new.source_offset.get() <= old.source_offset.get() {
                        debug!(?key, "out-of-order replay of an already-superseded occurrence, skipping");
                    } else {
                        output_events.push(delete_event(table, new, new));
                    }
                }
            }
        }

        overlays.insert(table.clone(), overlay);
    }

    // (a) produce all output events and await acknowledgement with a bounded timeout.
    if !output_events.is_empty() {
        let tasks = output.batch_produce(output_events).await?;
        output.flush().await?;
        for task in tasks {
            task.wait(ack_timeout).await?;
        }
    }

    // (b) multiPut the per-table overlay into the key->context store.
    for (table, overlay) in overlays {
        if overlay.is_empty() {
            continue;
        }
        kv_store.table(&table).multi_put(overlay).await?;
    }

    // (c) commit input offsets.
    for (&partition, &offset) in &batch.max_offset_per_partition {
        input_reader
            .ack_offset(partition, SourceOffset::new(offset))
            .await?;
    }

    Ok(())
}

fn insert_event(table: &TableName, new: &MessageContext) -> OutputEvent {
    OutputEvent::new(
        table.clone(),
        new.segment_name.clone(),
        new.source_offset,
        new.source_offset.get(),
        EventKind::Insert,
    )
}

fn delete_event(table: &TableName, target: &MessageContext, new: &MessageContext) -> OutputEvent {
    OutputEvent::new(
        table.clone(),
        target.segment_name.clone(),
        target.source_offset,
        new.source_offset.get(),
        EventKind::Delete,
    )
}
