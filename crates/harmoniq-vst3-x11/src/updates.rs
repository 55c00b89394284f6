use std::fmt;

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::trace;

use crate::host::DeferredUpdates;

type DeferredUpdate = Box<dyn FnOnce() + Send + 'static>;

/// Queue of GUI changes applied in batches when the idle thread flushes.
///
/// Any thread may defer work; the closures run on whichever thread calls
/// [`DeferredUpdateQueue::flush`].
pub struct DeferredUpdateQueue {
    tx: Sender<DeferredUpdate>,
    rx: Receiver<DeferredUpdate>,
}

impl DeferredUpdateQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn defer<F>(&self, update: F)
    where
        F: FnOnce() + Send + 'static,
    {
        // Both ends live in `self`, so the channel cannot be disconnected.
        let _ = self.tx.send(Box::new(update));
    }

    /// Number of updates waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Runs everything queued before this call. Updates deferred by a running
    /// update wait for the next flush.
    pub fn flush(&self) -> usize {
        let batch: Vec<DeferredUpdate> = self.rx.try_iter().take(self.rx.len()).collect();
        let applied = batch.len();
        for update in batch {
            update();
        }
        if applied > 0 {
            trace!(applied, "flushed deferred updates");
        }
        applied
    }
}

impl Default for DeferredUpdateQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl DeferredUpdates for DeferredUpdateQueue {
    fn trigger_deferred_updates(&self) {
        self.flush();
    }
}

impl fmt::Debug for DeferredUpdateQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredUpdateQueue")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn flush_applies_updates_in_order() {
        let queue = DeferredUpdateQueue::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for value in 0..3 {
            let log = Arc::clone(&log);
            queue.defer(move || log.lock().push(value));
        }

        assert_eq!(queue.pending(), 3);
        assert_eq!(queue.flush(), 3);
        assert_eq!(log.lock().as_slice(), &[0, 1, 2]);
        assert_eq!(queue.flush(), 0);
    }

    #[test]
    fn updates_deferred_during_flush_wait_for_next_flush() {
        let queue = Arc::new(DeferredUpdateQueue::new());
        let hits = Arc::new(Mutex::new(0));

        let inner_queue = Arc::clone(&queue);
        let inner_hits = Arc::clone(&hits);
        queue.defer(move || {
            *inner_hits.lock() += 1;
            let hits = Arc::clone(&inner_hits);
            inner_queue.defer(move || *hits.lock() += 10);
        });

        assert_eq!(queue.flush(), 1);
        assert_eq!(*hits.lock(), 1);
        assert_eq!(queue.flush(), 1);
        assert_eq!(*hits.lock(), 11);
    }
}
