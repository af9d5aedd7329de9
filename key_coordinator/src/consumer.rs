use crate::lifecycle::ShutdownHandle;
use backoff::{Backoff, BackoffConfig};
use log_client::{InputLogStreamHandler, InputRecord};
use observability_deps::tracing::{debug, warn};
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;

/// Single-producer loop that pulls batches from the input log into a bounded hand-off queue.
///
/// Repeatedly polls for up to `max_wait`, then enqueues each record into `queue_tx`. When the
/// queue is full the enqueue blocks — this is the backpressure surface, propagating downstream
/// slowness to the input log and eventually to the broker's fetch position. Errors from the log
/// client are logged and retried with backoff; the loop exits as soon as shutdown is signalled.
pub async fn run(
    mut handler: Box<dyn InputLogStreamHandler>,
    queue_tx: mpsc::Sender<InputRecord>,
    shutdown: Arc<ShutdownHandle>,
    max_wait: Duration,
    backoff_config: BackoffConfig,
) {
    let mut backoff = Backoff::new(&backoff_config);

    loop {
        if shutdown.is_cancelled() {
            debug!("input consumer loop shutting down");
            return;
        }

        let records = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                debug!("input consumer loop interrupted by shutdown while polling");
                return;
            }
            result = backoff.retry_all_errors("poll input log", || async {
                handler.poll(max_wait).await.map_err(|e| {
                    warn!(%e, "input log poll failed, will retry");
                    e
                })
            }) => {
                result.expect("backoff retries indefinitely and never gives up")
            }
        };

        for record in records {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    debug!("input consumer loop interrupted by shutdown while enqueuing");
                    return;
                }
                send_result = queue_tx.send(record) => {
                    if send_result.is_err() {
                        debug!("processing loop queue closed, exiting consumer loop");
                        return;
                    }
                }
            }
        }
    }
}
