//! Per-event routing through the seven pipeline stages.
//!
//! 1. store the value
//! 2. terminal rules (may stop)
//! 3. aircraft profile (may stop)
//! 4. display aggregation
//! 5. control sync
//! 6. one-shot state announcement
//! 7. continuous monitor
//!
//! The dispatcher runs only on the consumer thread and owns every structure it
//! mutates, except [`PendingAnnouncements`] which user-action handlers share.
//! A variable without a registry entry is never an error: stages that need
//! metadata skip it.

use crate::config::AppConfig;
use crate::dispatch::display::{DisplayAggregator, DisplayRefresh};
use crate::dispatch::monitor::ContinuousMonitor;
use crate::dispatch::pending::PendingAnnouncements;
use crate::dispatch::profile::{AircraftProfile, NoProfile, ProfileContext};
use crate::dispatch::rules::{FlightState, RuleContext, RuleTable};
use crate::dispatch::scheduler::UpdateHandler;
use crate::registry::VariableRegistry;
use crate::types::{format_value, VariableUpdateEvent};
use crate::ui::{Announcer, ProgrammaticUpdateFlag, UiSurface};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Number of events that entered each stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageCounters {
    pub store: u64,
    pub rules: u64,
    pub profile: u64,
    pub display: u64,
    pub control_sync: u64,
    pub one_shot: u64,
    pub monitor: u64,
}

/// The update dispatcher
pub struct UpdateDispatcher {
    current_values: HashMap<String, f64>,
    registry: Arc<dyn VariableRegistry>,
    rules: RuleTable,
    flight: FlightState,
    profile: Box<dyn AircraftProfile>,
    display: DisplayAggregator,
    placeholder: String,
    programmatic: ProgrammaticUpdateFlag,
    pending: Arc<PendingAnnouncements>,
    monitor: ContinuousMonitor,
    announcer: Box<dyn Announcer>,
    ui: Box<dyn UiSurface>,
    counters: StageCounters,
}

impl UpdateDispatcher {
    /// Dispatcher with the built-in rule table and no aircraft profile
    pub fn new(
        config: &AppConfig,
        registry: Arc<dyn VariableRegistry>,
        announcer: Box<dyn Announcer>,
        ui: Box<dyn UiSurface>,
    ) -> Self {
        Self {
            current_values: HashMap::new(),
            registry,
            rules: RuleTable::builtin(),
            flight: FlightState::default(),
            profile: Box::new(NoProfile),
            display: DisplayAggregator::new(),
            placeholder: config.display.placeholder.clone(),
            programmatic: ProgrammaticUpdateFlag::default(),
            pending: Arc::new(PendingAnnouncements::new()),
            monitor: ContinuousMonitor::new(config.monitor.grace_period()),
            announcer,
            ui,
            counters: StageCounters::default(),
        }
    }

    pub fn with_rules(mut self, rules: RuleTable) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_profile(mut self, profile: Box<dyn AircraftProfile>) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_flight_state(mut self, flight: FlightState) -> Self {
        self.flight = flight;
        self
    }

    /// Route one event through the pipeline
    pub fn dispatch(&mut self, event: &VariableUpdateEvent, now: Instant) {
        // 1. Store
        self.counters.store += 1;
        self.current_values.insert(event.name.clone(), event.value);

        // 2. Terminal rules
        self.counters.rules += 1;
        let outcome = {
            let mut ctx = RuleContext {
                registry: self.registry.as_ref(),
                announcer: self.announcer.as_ref(),
                ui: self.ui.as_mut(),
                flight: &mut self.flight,
            };
            self.rules.apply(event, &mut ctx)
        };
        if outcome.stops_pipeline() {
            return;
        }

        // 3. Aircraft profile
        self.counters.profile += 1;
        let ctx = ProfileContext {
            registry: self.registry.as_ref(),
            announcer: self.announcer.as_ref(),
            values: &self.current_values,
        };
        if self.profile.intercept(event, &ctx) {
            return;
        }

        // 4. Display aggregation
        self.counters.display += 1;
        self.aggregate_display(event);

        // 5. Control sync
        self.counters.control_sync += 1;
        self.sync_control(event);

        // 6. One-shot state announcement
        self.counters.one_shot += 1;
        if self.pending.take(&event.name) {
            let text = match self.registry.definition(&event.name) {
                Some(def) => def.spoken_value(event.value),
                None if !event.description.is_empty() => event.description.clone(),
                None => format!("{}: {}", event.name, format_value(event.value)),
            };
            self.announcer.announce(&text);
        }

        // 7. Continuous monitor
        self.counters.monitor += 1;
        if let Some(def) = self
            .registry
            .definition(&event.name)
            .filter(|def| def.is_monitored())
        {
            if let Some(text) = self.monitor.observe(def, event.value, now) {
                self.announcer.announce(&text);
            }
        }
    }

    fn aggregate_display(&mut self, event: &VariableUpdateEvent) {
        if !self.registry.is_display_variable(&event.name) {
            return;
        }
        let on_active_panel = self
            .display
            .record(&event.name, event.value, self.registry.as_ref());
        if on_active_panel && self.ui.is_display_visible() {
            let text = self
                .display
                .render(self.registry.as_ref(), &self.placeholder);
            self.ui.show_display_text(&text);
        }
    }

    fn sync_control(&mut self, event: &VariableUpdateEvent) {
        if !self.ui.has_control(&event.name) {
            return;
        }
        let Some(_guard) = self.programmatic.begin() else {
            tracing::trace!("Skipping re-entrant control sync for {}", event.name);
            return;
        };
        let label = self
            .registry
            .definition(&event.name)
            .and_then(|def| def.describe(event.value))
            .map(str::to_string)
            .unwrap_or_else(|| format_value(event.value));
        self.ui.sync_control(&event.name, event.value, &label);
    }

    /// Replace registry and profile for a new aircraft.
    ///
    /// Every piece of per-aircraft state is dropped and the monitor's grace
    /// period restarts at `now`.
    pub fn set_aircraft(
        &mut self,
        registry: Arc<dyn VariableRegistry>,
        profile: Box<dyn AircraftProfile>,
        now: Instant,
    ) {
        tracing::info!("Switching aircraft profile to '{}'", profile.name());
        self.registry = registry;
        self.profile = profile;
        self.reset_state();
        self.monitor.begin_grace(now);
    }

    /// Start of a simulator session
    pub fn begin_session(&mut self, now: Instant) {
        self.monitor.begin_grace(now);
    }

    /// Forget session state after a disconnect
    pub fn end_session(&mut self) {
        self.reset_state();
    }

    fn reset_state(&mut self) {
        self.current_values.clear();
        self.display.clear();
        self.flight.reset();
        self.monitor.reset();
        self.profile.reset();
        self.pending.clear();
    }

    /// Open `panel` on the display and register refresh signals for its variables
    pub fn begin_display_refresh(
        &mut self,
        panel: &str,
        now: Instant,
        timeout: Duration,
    ) -> DisplayRefresh {
        let keys = self.registry.display_variables(panel).to_vec();
        self.display.begin_refresh(panel, &keys, now, timeout)
    }

    /// Render the active panel and push it to the UI; returns the text
    pub fn publish_display(&mut self) -> String {
        self.display.finish_refresh();
        let text = self
            .display
            .render(self.registry.as_ref(), &self.placeholder);
        self.ui.show_display_text(&text);
        text
    }

    pub fn set_monitoring(&mut self, enabled: bool) {
        self.monitor.set_enabled(enabled);
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitor.is_enabled()
    }

    /// Handle for user-action code that wants the next value spoken once
    pub fn pending_announcements(&self) -> Arc<PendingAnnouncements> {
        self.pending.clone()
    }

    /// Flag shared with control edit handlers
    pub fn programmatic_flag(&self) -> ProgrammaticUpdateFlag {
        self.programmatic.clone()
    }

    pub fn current_value(&self, key: &str) -> Option<f64> {
        self.current_values.get(key).copied()
    }

    pub fn current_values(&self) -> &HashMap<String, f64> {
        &self.current_values
    }

    pub fn registry(&self) -> &Arc<dyn VariableRegistry> {
        &self.registry
    }

    pub fn flight(&self) -> &FlightState {
        &self.flight
    }

    pub fn display(&self) -> &DisplayAggregator {
        &self.display
    }

    pub fn counters(&self) -> StageCounters {
        self.counters
    }

    pub fn profile_name(&self) -> &str {
        self.profile.name()
    }

    pub fn announcer(&self) -> &dyn Announcer {
        self.announcer.as_ref()
    }

    pub fn ui_mut(&mut self) -> &mut dyn UiSurface {
        self.ui.as_mut()
    }
}

impl UpdateHandler for UpdateDispatcher {
    fn handle(&mut self, event: VariableUpdateEvent, now: Instant) {
        self.dispatch(&event, now);
    }
}

impl std::fmt::Debug for UpdateDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateDispatcher")
            .field("values", &self.current_values.len())
            .field("profile", &self.profile.name())
            .field("flight", &self.flight)
            .field("counters", &self.counters)
            .finish_non_exhaustive()
    }
}
