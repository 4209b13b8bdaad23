//! Bounded event queue between the simulator callback and the consumer.
//!
//! Producers call [`EventQueue::try_enqueue`] from any thread. The queue never
//! blocks and never grows past its capacity: once full, the *incoming* event is
//! discarded and counted. Already-queued events are never evicted.
//!
//! Only the consumer (the batch scheduler) dequeues.

use crate::config::QueueConfig;
use crate::types::{QueueStats, VariableUpdateEvent};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Thread-safe bounded FIFO with drop-newest overflow
#[derive(Debug)]
pub struct EventQueue {
    tx: Sender<VariableUpdateEvent>,
    rx: Receiver<VariableUpdateEvent>,
    capacity: usize,
    accepting: AtomicBool,
    dropped_count: AtomicU64,
    processed_batches: AtomicU64,
    drop_log_interval: u64,
}

impl EventQueue {
    /// Create a queue from config
    pub fn new(config: &QueueConfig) -> Self {
        let capacity = config.capacity.max(1);
        let (tx, rx) = bounded(capacity);
        Self {
            tx,
            rx,
            capacity,
            accepting: AtomicBool::new(true),
            dropped_count: AtomicU64::new(0),
            processed_batches: AtomicU64::new(0),
            drop_log_interval: config.drop_log_interval.max(1),
        }
    }

    /// Create a queue with the given capacity and default logging
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(&QueueConfig {
            capacity,
            ..QueueConfig::default()
        })
    }

    /// Append an event if there is room.
    ///
    /// Returns false when the queue is full (the event is dropped and counted)
    /// or closed after a disconnect (the event is discarded uncounted).
    pub fn try_enqueue(&self, event: VariableUpdateEvent) -> bool {
        if !self.accepting.load(Ordering::Acquire) {
            return false;
        }

        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                let dropped = self.dropped_count.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped % self.drop_log_interval == 0 {
                    tracing::warn!(
                        "Event queue full ({} queued), {} updates dropped so far (latest: {})",
                        self.capacity,
                        dropped,
                        event.name
                    );
                }
                false
            }
            // We hold the receiver, so this only happens during teardown
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Take the oldest event. Consumer only.
    pub fn try_dequeue(&self) -> Option<VariableUpdateEvent> {
        self.rx.try_recv().ok()
    }

    /// Events currently queued
    pub fn queued_count(&self) -> usize {
        self.rx.len()
    }

    /// Events rejected because the queue was full
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    /// Ticks that drained at least one event
    pub fn processed_batches(&self) -> u64 {
        self.processed_batches.load(Ordering::Relaxed)
    }

    /// Configured capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True if no events are queued
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Count a drained batch
    pub(crate) fn record_batch(&self) {
        self.processed_batches.fetch_add(1, Ordering::Relaxed);
    }

    /// Stop accepting events; later enqueues return false without counting
    pub fn close(&self) {
        self.accepting.store(false, Ordering::Release);
    }

    /// Accept events again
    pub fn open(&self) {
        self.accepting.store(true, Ordering::Release);
    }

    /// True if producers may enqueue
    pub fn is_open(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    /// Discard everything queued, returning how many events were discarded
    pub fn clear(&self) -> usize {
        self.rx.try_iter().count()
    }

    /// Reset dropped/processed counters
    pub fn reset_counters(&self) {
        self.dropped_count.store(0, Ordering::Relaxed);
        self.processed_batches.store(0, Ordering::Relaxed);
    }

    /// Snapshot of the diagnostic counters
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            capacity: self.capacity,
            queued_count: self.queued_count(),
            dropped_count: self.dropped_count(),
            processed_batches: self.processed_batches(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn event(i: usize) -> VariableUpdateEvent {
        VariableUpdateEvent::new(format!("VAR_{}", i), i as f64)
    }

    #[test]
    fn test_overflow_scenario() {
        let queue = EventQueue::with_capacity(2000);
        for i in 0..2000 {
            assert!(queue.try_enqueue(event(i)));
        }
        for i in 0..50 {
            assert!(!queue.try_enqueue(event(2000 + i)));
        }
        assert_eq!(queue.dropped_count(), 50);
        assert_eq!(queue.queued_count(), 2000);
    }

    #[test]
    fn test_drop_newest_keeps_oldest() {
        let queue = EventQueue::with_capacity(2);
        queue.try_enqueue(event(0));
        queue.try_enqueue(event(1));
        assert!(!queue.try_enqueue(event(2)));

        assert_eq!(queue.try_dequeue().unwrap().name, "VAR_0");
        assert_eq!(queue.try_dequeue().unwrap().name, "VAR_1");
        assert!(queue.try_dequeue().is_none());
    }

    #[test]
    fn test_dequeue_frees_capacity() {
        let queue = EventQueue::with_capacity(1);
        assert!(queue.try_enqueue(event(0)));
        assert!(!queue.try_enqueue(event(1)));
        queue.try_dequeue();
        assert!(queue.try_enqueue(event(2)));
        assert_eq!(queue.queued_count(), 1);
    }

    #[test]
    fn test_closed_queue_rejects_without_counting() {
        let queue = EventQueue::with_capacity(4);
        queue.close();
        assert!(!queue.try_enqueue(event(0)));
        assert_eq!(queue.dropped_count(), 0);
        assert!(queue.is_empty());

        queue.open();
        assert!(queue.try_enqueue(event(1)));
    }

    #[test]
    fn test_clear_and_reset() {
        let queue = EventQueue::with_capacity(3);
        for i in 0..5 {
            queue.try_enqueue(event(i));
        }
        queue.record_batch();
        assert_eq!(queue.clear(), 3);
        queue.reset_counters();

        let stats = queue.stats();
        assert_eq!(stats.queued_count, 0);
        assert_eq!(stats.dropped_count, 0);
        assert_eq!(stats.processed_batches, 0);
        assert_eq!(stats.capacity, 3);
    }

    #[test]
    fn test_concurrent_producers_respect_capacity() {
        let queue = Arc::new(EventQueue::with_capacity(100));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let queue = queue.clone();
                std::thread::spawn(move || {
                    (0..100)
                        .filter(|i| queue.try_enqueue(event(t * 100 + i)))
                        .count()
                })
            })
            .collect();

        let accepted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(accepted, 100);
        assert_eq!(queue.queued_count(), 100);
        assert_eq!(queue.dropped_count(), 300);
    }

    proptest! {
        #[test]
        fn test_queued_count_never_exceeds_capacity(
            capacity in 1usize..64,
            ops in prop::collection::vec(any::<bool>(), 0..300)
        ) {
            let queue = EventQueue::with_capacity(capacity);
            let mut expected_dropped = 0u64;
            for (i, enqueue) in ops.iter().enumerate() {
                if *enqueue {
                    let was_full = queue.queued_count() == capacity;
                    let accepted = queue.try_enqueue(event(i));
                    prop_assert_eq!(accepted, !was_full);
                    if was_full {
                        expected_dropped += 1;
                    }
                } else {
                    queue.try_dequeue();
                }
                prop_assert!(queue.queued_count() <= capacity);
                prop_assert_eq!(queue.dropped_count(), expected_dropped);
            }
        }

        #[test]
        fn test_fifo_within_capacity(n in 0usize..200) {
            let queue = EventQueue::with_capacity(200);
            for i in 0..n {
                prop_assert!(queue.try_enqueue(event(i)));
            }
            for i in 0..n {
                let ev = queue.try_dequeue().unwrap();
                prop_assert_eq!(ev.value, i as f64);
            }
            prop_assert!(queue.try_dequeue().is_none());
        }
    }
}
