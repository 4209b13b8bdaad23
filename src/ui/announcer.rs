//! Announcer interface towards the screen reader / TTS layer
//!
//! The dispatch pipeline never waits on speech. Every [`Announcer`] method is
//! fire-and-forget; implementations hand the text off to whatever actually
//! speaks it.
//!
//! Three delivery modes exist:
//!
//! - [`AnnouncementMode::Polite`] - queued, may be superseded by later speech
//! - [`AnnouncementMode::Interrupt`] - interrupts whatever is being spoken
//! - [`AnnouncementMode::Sequential`] - strictly ordered, never interrupted or dropped

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Speech output used by the dispatch pipeline
#[cfg_attr(test, mockall::automock)]
pub trait Announcer: Send {
    /// Queued speech that later announcements may supersede
    fn announce(&self, text: &str);

    /// Speech that interrupts current output
    fn announce_immediate(&self, text: &str);

    /// Speech delivered strictly in order, never dropped
    fn announce_with_queue(&self, text: &str);
}

/// How an announcement should be delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnouncementMode {
    /// Queued, may be superseded
    Polite,
    /// Interrupts current speech
    Interrupt,
    /// Strict sequential delivery
    Sequential,
}

/// A single piece of speech handed to the output layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub text: String,
    pub mode: AnnouncementMode,
}

/// Channel capacity for polite/interrupting announcements
const ANNOUNCEMENT_CHANNEL_CAPACITY: usize = 256;

/// Announcer that forwards speech over crossbeam channels.
///
/// Polite and interrupting speech share a bounded lane and are dropped (and
/// counted) when the speech driver falls behind. Sequential speech uses its
/// own unbounded lane so it is never lost.
#[derive(Debug, Clone)]
pub struct ChannelAnnouncer {
    general_tx: Sender<Announcement>,
    sequential_tx: Sender<Announcement>,
    dropped: Arc<AtomicU64>,
}

/// Receiving side of a [`ChannelAnnouncer`], owned by the speech driver
#[derive(Debug)]
pub struct AnnouncementReceiver {
    general_rx: Receiver<Announcement>,
    sequential_rx: Receiver<Announcement>,
}

impl ChannelAnnouncer {
    /// Create an announcer and the receiver the speech driver drains
    pub fn new() -> (Self, AnnouncementReceiver) {
        let (general_tx, general_rx) = bounded(ANNOUNCEMENT_CHANNEL_CAPACITY);
        let (sequential_tx, sequential_rx) = unbounded();
        (
            Self {
                general_tx,
                sequential_tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            AnnouncementReceiver {
                general_rx,
                sequential_rx,
            },
        )
    }

    /// Number of polite/interrupting announcements dropped because the driver lagged
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn try_send(&self, text: &str, mode: AnnouncementMode) {
        let announcement = Announcement {
            text: text.to_string(),
            mode,
        };
        match self.general_tx.try_send(announcement) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::trace!("Announcement receiver gone, dropping '{}'", text);
            }
        }
    }
}

impl Announcer for ChannelAnnouncer {
    fn announce(&self, text: &str) {
        self.try_send(text, AnnouncementMode::Polite);
    }

    fn announce_immediate(&self, text: &str) {
        self.try_send(text, AnnouncementMode::Interrupt);
    }

    fn announce_with_queue(&self, text: &str) {
        let _ = self.sequential_tx.send(Announcement {
            text: text.to_string(),
            mode: AnnouncementMode::Sequential,
        });
    }
}

impl AnnouncementReceiver {
    /// Drain everything currently pending, sequential speech first
    pub fn drain(&self) -> Vec<Announcement> {
        let mut out: Vec<Announcement> = self.sequential_rx.try_iter().collect();
        out.extend(self.general_rx.try_iter());
        out
    }

    /// Try to receive a single announcement without blocking
    pub fn try_recv(&self) -> Option<Announcement> {
        self.sequential_rx
            .try_recv()
            .or_else(|_| self.general_rx.try_recv())
            .ok()
    }
}

/// Announcer that writes speech to the log, for headless runs
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAnnouncer;

impl Announcer for TracingAnnouncer {
    fn announce(&self, text: &str) {
        tracing::info!(target: "simvox::speech", mode = "polite", "{}", text);
    }

    fn announce_immediate(&self, text: &str) {
        tracing::info!(target: "simvox::speech", mode = "interrupt", "{}", text);
    }

    fn announce_with_queue(&self, text: &str) {
        tracing::info!(target: "simvox::speech", mode = "sequential", "{}", text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modes_are_tagged() {
        let (announcer, rx) = ChannelAnnouncer::new();
        announcer.announce("polite");
        announcer.announce_immediate("now");
        announcer.announce_with_queue("in order");

        let all = rx.drain();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].mode, AnnouncementMode::Sequential);
        assert_eq!(all[1].text, "polite");
        assert_eq!(all[2].mode, AnnouncementMode::Interrupt);
    }

    #[test]
    fn test_general_lane_drops_when_full() {
        let (announcer, rx) = ChannelAnnouncer::new();
        for i in 0..ANNOUNCEMENT_CHANNEL_CAPACITY + 5 {
            announcer.announce(&format!("msg {}", i));
        }
        assert_eq!(announcer.dropped(), 5);
        assert_eq!(rx.drain().len(), ANNOUNCEMENT_CHANNEL_CAPACITY);
    }

    #[test]
    fn test_sequential_lane_never_drops() {
        let (announcer, rx) = ChannelAnnouncer::new();
        for i in 0..ANNOUNCEMENT_CHANNEL_CAPACITY * 2 {
            announcer.announce_with_queue(&format!("phase {}", i));
        }
        assert_eq!(announcer.dropped(), 0);
        let drained = rx.drain();
        assert_eq!(drained.len(), ANNOUNCEMENT_CHANNEL_CAPACITY * 2);
        assert_eq!(drained[0].text, "phase 0");
    }

    #[test]
    fn test_send_after_receiver_dropped_is_silent() {
        let (announcer, rx) = ChannelAnnouncer::new();
        drop(rx);
        announcer.announce("nobody listening");
        announcer.announce_with_queue("still fine");
        assert_eq!(announcer.dropped(), 0);
    }
}
