//! Recording collaborators shared across integration tests
//!
//! The crate's mockall mocks only exist inside its own unit tests, so
//! integration tests record calls through these instead.

use simvox::sim::VariableRequester;
use simvox::ui::{AnnouncementMode, Announcer, UiSurface};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Announcer that records every call
#[derive(Debug, Clone, Default)]
pub struct RecordingAnnouncer {
    spoken: Arc<Mutex<Vec<(AnnouncementMode, String)>>>,
}

impl RecordingAnnouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spoken(&self) -> Vec<(AnnouncementMode, String)> {
        self.spoken.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.spoken().into_iter().map(|(_, text)| text).collect()
    }

    fn push(&self, mode: AnnouncementMode, text: &str) {
        self.spoken.lock().unwrap().push((mode, text.to_string()));
    }
}

impl Announcer for RecordingAnnouncer {
    fn announce(&self, text: &str) {
        self.push(AnnouncementMode::Polite, text);
    }

    fn announce_immediate(&self, text: &str) {
        self.push(AnnouncementMode::Interrupt, text);
    }

    fn announce_with_queue(&self, text: &str) {
        self.push(AnnouncementMode::Sequential, text);
    }
}

/// Calls received by a [`RecordingSurface`]
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    SyncControl(String, f64, String),
    WindowTitle(String),
    SelectionLabel(String),
    DisplayText(String),
    Rebuild(String),
}

/// UI surface that records every call
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    calls: Arc<Mutex<Vec<SurfaceCall>>>,
    controls: Arc<Mutex<HashSet<String>>>,
    display_visible: bool,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_display_visible(mut self) -> Self {
        self.display_visible = true;
        self
    }

    pub fn with_control(self, key: &str) -> Self {
        self.controls.lock().unwrap().insert(key.to_string());
        self
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SurfaceCall::WindowTitle(title) => Some(title),
                _ => None,
            })
            .collect()
    }

    pub fn rebuilds(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SurfaceCall::Rebuild(panel) => Some(panel),
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: SurfaceCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl UiSurface for RecordingSurface {
    fn has_control(&self, key: &str) -> bool {
        self.controls.lock().unwrap().contains(key)
    }

    fn sync_control(&mut self, key: &str, value: f64, label: &str) {
        self.push(SurfaceCall::SyncControl(key.to_string(), value, label.to_string()));
    }

    fn set_window_title(&mut self, title: &str) {
        self.push(SurfaceCall::WindowTitle(title.to_string()));
    }

    fn set_selection_label(&mut self, label: &str) {
        self.push(SurfaceCall::SelectionLabel(label.to_string()));
    }

    fn is_display_visible(&self) -> bool {
        self.display_visible
    }

    fn show_display_text(&mut self, text: &str) {
        self.push(SurfaceCall::DisplayText(text.to_string()));
    }

    fn rebuild_panel(&mut self, panel: &str) {
        self.push(SurfaceCall::Rebuild(panel.to_string()));
    }
}

/// Requester that records which keys were asked for
#[derive(Debug, Clone, Default)]
pub struct RecordingRequester {
    requests: Arc<Mutex<Vec<String>>>,
}

impl RecordingRequester {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl VariableRequester for RecordingRequester {
    fn request_variable(&mut self, key: &str) {
        self.requests.lock().unwrap().push(key.to_string());
    }

    fn request_panel(&mut self, panel: &str, _keys: &[String]) {
        self.requests.lock().unwrap().push(format!("panel:{}", panel));
    }

    fn request_all(&mut self) {
        self.requests.lock().unwrap().push("*".to_string());
    }
}
