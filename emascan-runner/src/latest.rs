//! Holder for the most recently completed batch.
//!
//! Publishing swaps a whole `Arc<BatchResult>` into a `tokio::sync::watch`
//! slot in one step, so readers see either the previous complete batch or
//! the new one. Readers that want to react to new batches hold a receiver
//! from `subscribe()`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::batch::BatchResult;

#[derive(Debug)]
pub struct LatestBatch {
    tx: watch::Sender<Option<Arc<BatchResult>>>,
    publishes: AtomicU64,
}

impl Default for LatestBatch {
    fn default() -> Self {
        Self::new()
    }
}

impl LatestBatch {
    /// Empty holder: `get()` returns `None` until the first publish.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            tx,
            publishes: AtomicU64::new(0),
        }
    }

    /// Replace the current batch. Works with or without subscribers.
    pub fn publish(&self, batch: BatchResult) -> Arc<BatchResult> {
        let batch = Arc::new(batch);
        self.tx.send_replace(Some(Arc::clone(&batch)));
        let n = self.publishes.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(
            publish = n,
            as_of = %batch.as_of,
            entries = batch.len(),
            "latest: published batch"
        );
        batch
    }

    pub fn get(&self) -> Option<Arc<BatchResult>> {
        self.tx.borrow().clone()
    }

    /// Receiver woken on every publish.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<BatchResult>>> {
        self.tx.subscribe()
    }

    pub fn publish_count(&self) -> u64 {
        self.publishes.load(Ordering::SeqCst)
    }
}
