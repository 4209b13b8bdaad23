//! UI surface the dispatch pipeline writes to
//!
//! The host application owns every control and window. The core only looks
//! controls up by variable key and pushes state into them, so the lifecycle of
//! the controls stays entirely on the UI side.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// UI operations the pipeline and runtime need
#[cfg_attr(test, mockall::automock)]
pub trait UiSurface: Send {
    /// True if a visible input control is bound to this variable key
    fn has_control(&self, key: &str) -> bool;

    /// Push a value into the control bound to `key`
    fn sync_control(&mut self, key: &str, value: f64, label: &str);

    /// Change the main window title
    fn set_window_title(&mut self, title: &str);

    /// Update the label of the currently selected panel
    fn set_selection_label(&mut self, label: &str);

    /// True if the variable display is currently shown
    fn is_display_visible(&self) -> bool;

    /// Replace the variable display text
    fn show_display_text(&mut self, text: &str);

    /// Discard the old panel's controls and build the new panel
    fn rebuild_panel(&mut self, panel: &str);
}

/// Surface with no UI attached
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessSurface;

impl UiSurface for HeadlessSurface {
    fn has_control(&self, _key: &str) -> bool {
        false
    }

    fn sync_control(&mut self, _key: &str, _value: f64, _label: &str) {}

    fn set_window_title(&mut self, title: &str) {
        tracing::debug!("Window title: {}", title);
    }

    fn set_selection_label(&mut self, label: &str) {
        tracing::debug!("Selected: {}", label);
    }

    fn is_display_visible(&self) -> bool {
        false
    }

    fn show_display_text(&mut self, _text: &str) {}

    fn rebuild_panel(&mut self, panel: &str) {
        tracing::debug!("Rebuilt panel {}", panel);
    }
}

/// Flag shared with UI edit handlers telling them a control change came
/// from the pipeline rather than from the user.
#[derive(Debug, Clone, Default)]
pub struct ProgrammaticUpdateFlag(Arc<AtomicBool>);

impl ProgrammaticUpdateFlag {
    /// True while the pipeline is writing into a control
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Mark the start of a programmatic update.
    ///
    /// Returns `None` if an update is already in progress, which means the
    /// caller was re-entered from a control change handler.
    pub fn begin(&self) -> Option<ProgrammaticUpdateGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ProgrammaticUpdateGuard(self.0.clone()))
    }
}

/// Clears the programmatic update flag on drop
#[derive(Debug)]
pub struct ProgrammaticUpdateGuard(Arc<AtomicBool>);

impl Drop for ProgrammaticUpdateGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_sets_and_clears_flag() {
        let flag = ProgrammaticUpdateFlag::default();
        assert!(!flag.is_set());
        {
            let _guard = flag.begin().unwrap();
            assert!(flag.is_set());
        }
        assert!(!flag.is_set());
    }

    #[test]
    fn test_reentrant_begin_rejected() {
        let flag = ProgrammaticUpdateFlag::default();
        let shared = flag.clone();
        let _guard = flag.begin().unwrap();
        assert!(shared.begin().is_none());
        assert!(shared.is_set());
    }
}
