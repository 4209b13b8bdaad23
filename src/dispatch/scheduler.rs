//! Fixed-cadence batch drain on the consumer thread.
//!
//! Each tick dequeues at most `max_batch_size` events and hands them, in FIFO
//! order, to an [`UpdateHandler`]. Whatever is left waits for the next tick so
//! a burst never stalls the consumer for long.
//!
//! The scheduler is driven by an explicit monotonic clock: callers pass `now`
//! and the scheduler reports when it next wants to run. The runtime loop
//! sleeps until that deadline.

use crate::config::SchedulerConfig;
use crate::dispatch::queue::EventQueue;
use crate::types::{TickReport, VariableUpdateEvent};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};

/// Underrun warnings repeat every this many consecutive underrun ticks (~1 s at 30 Hz)
const UNDERRUN_LOG_EVERY: u64 = 30;

/// Consumer of dequeued events
pub trait UpdateHandler {
    /// Process one event. Must not block.
    fn handle(&mut self, event: VariableUpdateEvent, now: Instant);
}

impl<F> UpdateHandler for F
where
    F: FnMut(VariableUpdateEvent, Instant),
{
    fn handle(&mut self, event: VariableUpdateEvent, now: Instant) {
        self(event, now)
    }
}

/// Batch drain scheduler
#[derive(Debug)]
pub struct BatchScheduler {
    interval: Duration,
    max_batch_size: usize,
    next_tick: Option<Instant>,
    last_report: TickReport,
    underrun_ticks: u64,
}

impl BatchScheduler {
    /// Create a stopped scheduler
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            interval: config.interval().max(Duration::from_millis(1)),
            max_batch_size: config.max_batch_size.max(1),
            next_tick: None,
            last_report: TickReport::default(),
            underrun_ticks: 0,
        }
    }

    /// Start ticking; the first tick is due one interval from `now`
    pub fn start(&mut self, now: Instant) {
        self.next_tick = Some(now + self.interval);
        self.underrun_ticks = 0;
        tracing::debug!(
            "Batch scheduler started ({:?} interval, {} events per tick)",
            self.interval,
            self.max_batch_size
        );
    }

    /// Stop ticking and empty the queue.
    ///
    /// Runs on the consumer between ticks, so no batch is ever half drained.
    /// The queue is closed first so late producer callbacks cannot refill it,
    /// then cleared and its counters reset. Returns the number of discarded events.
    pub fn stop(&mut self, queue: &EventQueue) -> usize {
        self.next_tick = None;
        queue.close();
        let discarded = queue.clear();
        queue.reset_counters();
        self.last_report = TickReport::default();
        self.underrun_ticks = 0;
        tracing::debug!("Batch scheduler stopped, discarded {} queued updates", discarded);
        discarded
    }

    /// True while started
    pub fn is_running(&self) -> bool {
        self.next_tick.is_some()
    }

    /// When the next tick is due
    pub fn next_deadline(&self) -> Option<Instant> {
        self.next_tick
    }

    /// Tick interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Per-tick cap
    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Most recent tick report
    pub fn last_report(&self) -> TickReport {
        self.last_report
    }

    /// Run a tick if one is due at `now`
    pub fn poll<H: UpdateHandler>(
        &mut self,
        now: Instant,
        queue: &EventQueue,
        handler: &mut H,
    ) -> Option<TickReport> {
        let due = self.next_tick?;
        if now < due {
            return None;
        }

        // Skip missed ticks rather than bursting to catch up
        let mut next = due + self.interval;
        if next <= now {
            next = now + self.interval;
        }
        self.next_tick = Some(next);

        Some(self.drain_batch(now, queue, handler))
    }

    /// Dequeue and dispatch up to `max_batch_size` events
    pub fn drain_batch<H: UpdateHandler>(
        &mut self,
        now: Instant,
        queue: &EventQueue,
        handler: &mut H,
    ) -> TickReport {
        let depth_before = queue.queued_count();
        let mut dispatched = 0;
        let mut failed = 0;

        while dispatched < self.max_batch_size {
            let Some(event) = queue.try_dequeue() else {
                break;
            };
            dispatched += 1;

            let name = event.name.clone();
            if catch_unwind(AssertUnwindSafe(|| handler.handle(event, now))).is_err() {
                failed += 1;
                tracing::error!("Dispatch of '{}' panicked; continuing with the batch", name);
            }
        }

        if dispatched > 0 {
            queue.record_batch();
        }

        let report = TickReport {
            depth_before,
            depth_after: queue.queued_count(),
            dispatched,
            failed,
        };
        self.track_underrun(queue.capacity(), &report);
        self.last_report = report;
        report
    }

    fn track_underrun(&mut self, capacity: usize, report: &TickReport) {
        if report.depth_after > capacity / 2 {
            if self.underrun_ticks % UNDERRUN_LOG_EVERY == 0 {
                tracing::warn!(
                    "Event queue above half capacity ({}/{}); consider a shorter interval or larger batch",
                    report.depth_after,
                    capacity
                );
            }
            self.underrun_ticks += 1;
        } else {
            self.underrun_ticks = 0;
        }
    }

    /// True if the most recent tick left the queue above half capacity
    pub fn is_underrun(&self) -> bool {
        self.underrun_ticks > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_batch_size: usize) -> SchedulerConfig {
        SchedulerConfig {
            interval_ms: 33,
            max_batch_size,
        }
    }

    fn fill(queue: &EventQueue, n: usize) {
        for i in 0..n {
            queue.try_enqueue(VariableUpdateEvent::new(format!("V{}", i), i as f64));
        }
    }

    #[test]
    fn test_batch_cap_respected() {
        let queue = EventQueue::with_capacity(2000);
        fill(&queue, 120);
        let mut scheduler = BatchScheduler::new(&config(50));
        let mut seen = Vec::new();
        let mut handler = |ev: VariableUpdateEvent, _now: Instant| seen.push(ev.value);

        let report = scheduler.drain_batch(Instant::now(), &queue, &mut handler);
        assert_eq!(report.dispatched, 50);
        assert_eq!(report.depth_before, 120);
        assert_eq!(report.depth_after, 70);
        assert_eq!(queue.processed_batches(), 1);
        assert_eq!(seen.len(), 50);
        assert_eq!(seen[0], 0.0);
        assert_eq!(seen[49], 49.0);
    }

    #[test]
    fn test_order_preserved_across_batches() {
        let queue = EventQueue::with_capacity(100);
        fill(&queue, 25);
        let mut scheduler = BatchScheduler::new(&config(10));
        let mut seen = Vec::new();
        let mut handler = |ev: VariableUpdateEvent, _now: Instant| seen.push(ev.value as usize);

        let now = Instant::now();
        for _ in 0..3 {
            scheduler.drain_batch(now, &queue, &mut handler);
        }
        assert_eq!(seen, (0..25).collect::<Vec<_>>());
        assert_eq!(queue.processed_batches(), 3);
    }

    #[test]
    fn test_empty_tick_is_not_a_batch() {
        let queue = EventQueue::with_capacity(10);
        let mut scheduler = BatchScheduler::new(&config(10));
        let mut handler = |_: VariableUpdateEvent, _: Instant| {};
        let report = scheduler.drain_batch(Instant::now(), &queue, &mut handler);
        assert_eq!(report.dispatched, 0);
        assert_eq!(queue.processed_batches(), 0);
    }

    #[test]
    fn test_poll_respects_interval() {
        let queue = EventQueue::with_capacity(10);
        fill(&queue, 5);
        let mut scheduler = BatchScheduler::new(&config(10));
        let mut handler = |_: VariableUpdateEvent, _: Instant| {};
        let t0 = Instant::now();

        assert!(scheduler.poll(t0, &queue, &mut handler).is_none(), "stopped");
        scheduler.start(t0);
        assert!(scheduler.poll(t0 + Duration::from_millis(10), &queue, &mut handler).is_none());

        let report = scheduler
            .poll(t0 + Duration::from_millis(33), &queue, &mut handler)
            .unwrap();
        assert_eq!(report.dispatched, 5);
        assert_eq!(
            scheduler.next_deadline(),
            Some(t0 + Duration::from_millis(66))
        );
    }

    #[test]
    fn test_missed_ticks_do_not_burst() {
        let queue = EventQueue::with_capacity(10);
        let mut scheduler = BatchScheduler::new(&config(10));
        let mut handler = |_: VariableUpdateEvent, _: Instant| {};
        let t0 = Instant::now();
        scheduler.start(t0);

        let late = t0 + Duration::from_millis(500);
        assert!(scheduler.poll(late, &queue, &mut handler).is_some());
        assert_eq!(scheduler.next_deadline(), Some(late + Duration::from_millis(33)));
        assert!(scheduler.poll(late, &queue, &mut handler).is_none());
    }

    #[test]
    fn test_panicking_event_is_isolated() {
        let queue = EventQueue::with_capacity(10);
        queue.try_enqueue(VariableUpdateEvent::new("OK_1", 1.0));
        queue.try_enqueue(VariableUpdateEvent::new("BAD", 2.0));
        queue.try_enqueue(VariableUpdateEvent::new("OK_2", 3.0));

        let mut scheduler = BatchScheduler::new(&config(10));
        let mut handled = Vec::new();
        let mut handler = |ev: VariableUpdateEvent, _: Instant| {
            if ev.name == "BAD" {
                panic!("malformed update");
            }
            handled.push(ev.name);
        };

        let report = scheduler.drain_batch(Instant::now(), &queue, &mut handler);
        assert_eq!(report.dispatched, 3);
        assert_eq!(report.failed, 1);
        assert_eq!(handled, vec!["OK_1".to_string(), "OK_2".to_string()]);
    }

    #[test]
    fn test_stop_clears_queue_and_counters() {
        let queue = EventQueue::with_capacity(5);
        fill(&queue, 8);
        let mut scheduler = BatchScheduler::new(&config(2));
        let mut handler = |_: VariableUpdateEvent, _: Instant| {};
        scheduler.start(Instant::now());
        scheduler.drain_batch(Instant::now(), &queue, &mut handler);

        assert_eq!(scheduler.stop(&queue), 3);
        assert!(!scheduler.is_running());
        assert_eq!(queue.stats().dropped_count, 0);
        assert_eq!(queue.stats().processed_batches, 0);

        // Late producer callbacks are refused until reconnect
        assert!(!queue.try_enqueue(VariableUpdateEvent::new("LATE", 1.0)));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_underrun_detected() {
        let queue = EventQueue::with_capacity(100);
        fill(&queue, 90);
        let mut scheduler = BatchScheduler::new(&config(10));
        let mut handler = |_: VariableUpdateEvent, _: Instant| {};

        scheduler.drain_batch(Instant::now(), &queue, &mut handler);
        assert!(scheduler.is_underrun());

        for _ in 0..4 {
            scheduler.drain_batch(Instant::now(), &queue, &mut handler);
        }
        assert_eq!(queue.queued_count(), 40);
        assert!(!scheduler.is_underrun());
    }
}
