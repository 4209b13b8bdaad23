//! Pending one-shot state announcements.
//!
//! User-action handlers mark a key when the resulting state should be spoken
//! once ("what did my toggle just do?"). The dispatcher removes the key the
//! next time an update for it arrives. Insertion may happen from any thread.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

/// Concurrent set of keys awaiting a one-shot announcement
#[derive(Debug, Default)]
pub struct PendingAnnouncements {
    keys: Mutex<HashSet<String>>,
}

impl PendingAnnouncements {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic elsewhere must not disable announcements for the session
    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.keys.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Mark a key. Returns false if it was already pending.
    pub fn insert(&self, key: impl Into<String>) -> bool {
        self.lock().insert(key.into())
    }

    /// Remove a key, returning true only for the caller that actually removed it
    pub fn take(&self, key: &str) -> bool {
        self.lock().remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_take_at_most_once() {
        let pending = PendingAnnouncements::new();
        assert!(pending.insert("A32NX_AUTOBRAKES_ARMED_MODE"));
        assert!(!pending.insert("A32NX_AUTOBRAKES_ARMED_MODE"));
        assert!(pending.take("A32NX_AUTOBRAKES_ARMED_MODE"));
        assert!(!pending.take("A32NX_AUTOBRAKES_ARMED_MODE"));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_concurrent_take_single_winner() {
        let pending = Arc::new(PendingAnnouncements::new());
        pending.insert("KEY");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pending = pending.clone();
                std::thread::spawn(move || pending.take("KEY"))
            })
            .collect();

        let winners = handles
            .into_iter()
            .filter_map(|h| h.join().ok())
            .filter(|took| *took)
            .count();
        assert_eq!(winners, 1);
    }
}
