//! Per-panel variable display.
//!
//! The aggregator caches display-variable values as they pass through the
//! dispatcher and renders the open panel as one line per variable.
//!
//! # Refresh fan-in
//!
//! "Refresh all variables in this panel" registers one completion signal per
//! requested key. The dispatcher fires a signal when the matching update
//! arrives. The returned [`DisplayRefresh`] completes when every signal has
//! fired or the timeout elapses, whichever comes first; on timeout the missing
//! variables render as a placeholder.
//!
//! The refresh never blocks the consumer: the runtime polls it with the
//! current time. [`DisplayRefresh::wait`] exists for callers on other threads.

use crate::registry::VariableRegistry;
use crate::types::format_value;
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// Display value cache and pending refresh signals
#[derive(Debug, Default)]
pub struct DisplayAggregator {
    panel: Option<String>,
    cache: HashMap<String, f64>,
    pending: HashMap<String, Sender<()>>,
}

impl DisplayAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Panel whose values are being displayed
    pub fn active_panel(&self) -> Option<&str> {
        self.panel.as_deref()
    }

    /// Cached value for a key
    pub fn cached(&self, key: &str) -> Option<f64> {
        self.cache.get(key).copied()
    }

    /// Number of keys still waiting for a refresh answer
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Switch to `panel`, clear the cache and register one signal per key.
    ///
    /// Any refresh still in flight is abandoned.
    pub fn begin_refresh(
        &mut self,
        panel: &str,
        keys: &[String],
        now: Instant,
        timeout: Duration,
    ) -> DisplayRefresh {
        self.panel = Some(panel.to_string());
        self.cache.clear();
        self.pending.clear();

        let mut signals = Vec::with_capacity(keys.len());
        for key in keys {
            if self.pending.contains_key(key) {
                continue;
            }
            let (tx, rx) = bounded(1);
            self.pending.insert(key.clone(), tx);
            signals.push((key.clone(), rx));
        }

        tracing::debug!(
            "Display refresh for '{}' waiting on {} variables",
            panel,
            signals.len()
        );

        DisplayRefresh {
            panel: panel.to_string(),
            deadline: now + timeout,
            signals,
            resolved: HashSet::new(),
        }
    }

    /// Cache a value of the active panel and fire its pending signal, if any.
    ///
    /// Keys outside the active panel are ignored. Returns true if the key
    /// belongs to the active panel.
    pub fn record(&mut self, key: &str, value: f64, registry: &dyn VariableRegistry) -> bool {
        let on_panel = self
            .panel
            .as_deref()
            .is_some_and(|panel| registry.display_variables(panel).iter().any(|k| k == key));
        if !on_panel {
            return false;
        }
        self.cache.insert(key.to_string(), value);
        if let Some(signal) = self.pending.remove(key) {
            let _ = signal.try_send(());
        }
        true
    }

    /// Tear down the signals of the current refresh
    pub fn finish_refresh(&mut self) {
        self.pending.clear();
    }

    /// Forget the panel and all cached values
    pub fn clear(&mut self) {
        self.panel = None;
        self.cache.clear();
        self.pending.clear();
    }

    /// Render the active panel, or an empty string if none is open
    pub fn render(&self, registry: &dyn VariableRegistry, placeholder: &str) -> String {
        match self.panel.as_deref() {
            Some(panel) => self.render_panel(panel, registry, placeholder),
            None => String::new(),
        }
    }

    /// Render one line per display variable of `panel`
    pub fn render_panel(
        &self,
        panel: &str,
        registry: &dyn VariableRegistry,
        placeholder: &str,
    ) -> String {
        registry
            .display_variables(panel)
            .iter()
            .map(|key| {
                let definition = registry.definition(key);
                let name = definition.map_or(key.as_str(), |d| d.display_name.as_str());
                let text = match (self.cache.get(key), definition) {
                    (None, _) => placeholder.to_string(),
                    (Some(&value), Some(def)) => match def.describe(value) {
                        Some(desc) => desc.to_string(),
                        None if def.units.is_empty() => format_value(value),
                        None => format!("{} {}", format_value(value), def.units),
                    },
                    (Some(&value), None) => format_value(value),
                };
                format!("{}: {}", name, text)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// In-flight "refresh all variables in this panel" operation
#[derive(Debug)]
pub struct DisplayRefresh {
    panel: String,
    deadline: Instant,
    signals: Vec<(String, Receiver<()>)>,
    resolved: HashSet<String>,
}

/// How a refresh ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub panel: String,
    /// True if every requested variable answered before the deadline
    pub complete: bool,
    /// Keys that never answered
    pub missing: Vec<String>,
}

impl DisplayRefresh {
    pub fn panel(&self) -> &str {
        &self.panel
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Number of variables that have answered
    pub fn resolved_count(&self) -> usize {
        self.resolved.len()
    }

    fn collect_signals(&mut self) {
        for (key, rx) in &self.signals {
            if self.resolved.contains(key) {
                continue;
            }
            match rx.try_recv() {
                Ok(()) => {
                    self.resolved.insert(key.clone());
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {}
            }
        }
    }

    fn outcome(&self) -> RefreshOutcome {
        let missing: Vec<String> = self
            .signals
            .iter()
            .filter(|(key, _)| !self.resolved.contains(key))
            .map(|(key, _)| key.clone())
            .collect();
        RefreshOutcome {
            panel: self.panel.clone(),
            complete: missing.is_empty(),
            missing,
        }
    }

    /// Non-blocking check. Returns the outcome once all signals fired or `now`
    /// reached the deadline.
    pub fn poll(&mut self, now: Instant) -> Option<RefreshOutcome> {
        self.collect_signals();
        if self.resolved.len() == self.signals.len() || now >= self.deadline {
            Some(self.outcome())
        } else {
            None
        }
    }

    /// End the refresh early with whatever has answered so far
    pub fn abandon(mut self) -> RefreshOutcome {
        self.collect_signals();
        self.outcome()
    }

    /// Block until complete or the deadline passes. Not for the consumer thread.
    pub fn wait(mut self) -> RefreshOutcome {
        for (key, rx) in &self.signals {
            if self.resolved.contains(key) {
                continue;
            }
            if rx.recv_deadline(self.deadline).is_ok() {
                self.resolved.insert(key.clone());
            }
        }
        self.collect_signals();
        self.outcome()
    }
}
