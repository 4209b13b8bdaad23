//! Producer side of the bridge
//!
//! The simulator interconnect calls back on its own thread. Those callbacks
//! only ever see an [`UpdateSink`], which can enqueue but never dequeue.
//! Value requests travel the other way through a [`VariableRequester`].

use crate::dispatch::EventQueue;
use crate::types::VariableUpdateEvent;
use std::sync::Arc;

/// Asks the simulator to (re)send current values.
///
/// Answers arrive later through the queue as initial-value updates.
#[cfg_attr(test, mockall::automock)]
pub trait VariableRequester: Send {
    /// Request the current value of one variable
    fn request_variable(&mut self, key: &str);

    /// Request every display variable of a panel
    fn request_panel(&mut self, panel: &str, keys: &[String]);

    /// Request every variable the simulator knows about
    fn request_all(&mut self);
}

/// Requester for sessions without a simulator
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRequester;

impl VariableRequester for NullRequester {
    fn request_variable(&mut self, key: &str) {
        tracing::trace!("No simulator to request {} from", key);
    }

    fn request_panel(&mut self, _panel: &str, _keys: &[String]) {}

    fn request_all(&mut self) {}
}

/// Enqueue-only handle given to producers
#[derive(Debug, Clone)]
pub struct UpdateSink {
    queue: Arc<EventQueue>,
}

impl UpdateSink {
    pub fn new(queue: Arc<EventQueue>) -> Self {
        Self { queue }
    }

    /// Offer an event. Returns false if it was dropped or the session is closed.
    pub fn push(&self, event: VariableUpdateEvent) -> bool {
        self.queue.try_enqueue(event)
    }

    /// Report a change of `name`
    pub fn push_value(&self, name: &str, value: f64) -> bool {
        self.push(VariableUpdateEvent::new(name, value))
    }

    /// Answer an explicit request for `name`
    pub fn push_initial(&self, name: &str, value: f64) -> bool {
        self.push(VariableUpdateEvent::initial(name, value))
    }

    /// False between disconnect and the next connect
    pub fn is_open(&self) -> bool {
        self.queue.is_open()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_enqueues() {
        let queue = Arc::new(EventQueue::with_capacity(4));
        let sink = UpdateSink::new(queue.clone());

        assert!(sink.push_value("FCU_HEADING", 180.0));
        assert!(sink.push_initial("FCU_SPEED", 250.0));
        assert_eq!(queue.queued_count(), 2);

        let first = queue.try_dequeue().unwrap();
        assert!(!first.is_initial_value);
        let second = queue.try_dequeue().unwrap();
        assert!(second.is_initial_value);
    }

    #[test]
    fn test_sink_rejects_when_closed() {
        let queue = Arc::new(EventQueue::with_capacity(4));
        let sink = UpdateSink::new(queue.clone());
        queue.close();
        assert!(!sink.is_open());
        assert!(!sink.push_value("FCU_HEADING", 180.0));
        assert_eq!(queue.dropped_count(), 0);
    }

    #[test]
    fn test_mock_requester_records_panel() {
        let mut requester = MockVariableRequester::new();
        requester
            .expect_request_panel()
            .withf(|panel: &str, keys: &[String]| panel == "FCU" && keys.len() == 2)
            .times(1)
            .return_const(());
        let keys = vec!["A".to_string(), "B".to_string()];
        requester.request_panel("FCU", &keys);
    }
}
