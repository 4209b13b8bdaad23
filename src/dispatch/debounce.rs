//! Restart-on-activity debounce for panel rebuilds.
//!
//! Every trigger replaces the pending target and pushes the deadline out by
//! the full delay. The rebuild fires once, for the last target, after input
//! has been quiet for the whole delay. Intermediate targets are never built.

use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Record `target` as pending and restart the timer.
    ///
    /// Returns the previously pending target, which is now discarded.
    pub fn trigger(&mut self, target: T, now: Instant) -> Option<T> {
        self.pending
            .replace((target, now + self.delay))
            .map(|(previous, _)| previous)
    }

    /// Take the pending target if its deadline has passed
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.pending {
            Some((_, deadline)) if now >= deadline => self.pending.take().map(|(t, _)| t),
            _ => None,
        }
    }

    /// Drop the pending target without firing
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(t, _)| t)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_target(&self) -> Option<&T> {
        self.pending.as_ref().map(|(t, _)| t)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, d)| *d)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}
