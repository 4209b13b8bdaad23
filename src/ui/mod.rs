//! UI-side collaborators of the dispatch pipeline
//!
//! - [`Announcer`] - speech output (polite, interrupting, sequential)
//! - [`UiSurface`] - controls, window title, display text and panel rebuilds
//! - [`ProgrammaticUpdateFlag`] - reentrancy flag shared with control edit handlers

pub mod announcer;
pub mod surface;

pub use announcer::{
    Announcement, AnnouncementMode, AnnouncementReceiver, Announcer, ChannelAnnouncer,
    TracingAnnouncer,
};
pub use surface::{HeadlessSurface, ProgrammaticUpdateFlag, ProgrammaticUpdateGuard, UiSurface};

#[cfg(test)]
pub use announcer::MockAnnouncer;
#[cfg(test)]
pub use surface::MockUiSurface;
