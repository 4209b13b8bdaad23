//! Ordered table of special-case variable rules.
//!
//! Each [`Rule`] pairs a name matcher with a handler and a `terminal` flag.
//! Rules are evaluated in order and the first match wins. When a terminal rule
//! matches, the dispatcher stops processing the event after the handler runs.
//!
//! The built-in table ([`RuleTable::builtin`]) covers:
//!
//! | Rule | Match | Speech |
//! |------|-------|--------|
//! | `flight-phase` | `A32NX_FMGC_FLIGHT_PHASE` | sequential, on phase change, plus window title |
//! | `hotkey-readback` | FCU read-back keys | interrupting |
//! | `guidance-status` | FMA / approach status keys | polite, on change |
//! | `led-state` | `LED_` prefix | polite, on change |
//!
//! Initial-value answers update rule state silently; only real changes speak.

use crate::registry::VariableRegistry;
use crate::types::{format_value, same_value, VariableUpdateEvent};
use crate::ui::{Announcer, UiSurface};
use std::collections::HashMap;

/// Flight-phase variable key
pub const FLIGHT_PHASE_KEY: &str = "A32NX_FMGC_FLIGHT_PHASE";

/// Variables read back on demand by hotkeys, with their fallback labels
pub const HOTKEY_READBACK: &[(&str, &str)] = &[
    ("FCU_HEADING", "Heading"),
    ("FCU_SPEED", "Speed"),
    ("FCU_ALTITUDE", "Altitude"),
    ("FCU_VERTICAL_SPEED", "Vertical speed"),
    ("FCU_MACH", "Mach"),
];

/// Guidance and approach status variables
pub const GUIDANCE_STATUS: &[&str] = &[
    "A32NX_FMA_LATERAL_MODE",
    "A32NX_FMA_VERTICAL_MODE",
    "A32NX_APPROACH_CAPABILITY",
];

/// Prefix of annunciator light variables
pub const LED_PREFIX: &str = "LED_";

/// Application title used as the base of the window title
pub const DEFAULT_BASE_TITLE: &str = "SimVox";

/// State the rules keep between events
#[derive(Debug, Clone)]
pub struct FlightState {
    base_title: String,
    phase: Option<String>,
    guidance: HashMap<String, f64>,
    leds: HashMap<String, bool>,
}

impl Default for FlightState {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_TITLE)
    }
}

impl FlightState {
    pub fn new(base_title: impl Into<String>) -> Self {
        Self {
            base_title: base_title.into(),
            phase: None,
            guidance: HashMap::new(),
            leds: HashMap::new(),
        }
    }

    /// Start from a known phase
    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    pub fn phase(&self) -> Option<&str> {
        self.phase.as_deref()
    }

    /// Window title for the current phase
    pub fn title(&self) -> String {
        match &self.phase {
            Some(phase) => format!("{} - {}", self.base_title, phase),
            None => self.base_title.clone(),
        }
    }

    /// Forget everything learned from the previous aircraft
    pub fn reset(&mut self) {
        self.phase = None;
        self.guidance.clear();
        self.leds.clear();
    }
}

/// Everything a rule handler may touch
pub struct RuleContext<'a> {
    pub registry: &'a dyn VariableRegistry,
    pub announcer: &'a dyn Announcer,
    pub ui: &'a mut dyn UiSurface,
    pub flight: &'a mut FlightState,
}

/// Rule handler signature
pub type RuleHandler = Box<dyn Fn(&VariableUpdateEvent, &mut RuleContext<'_>) + Send>;

/// How a rule selects variable names
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleMatcher {
    /// Exactly this name
    Exact(String),
    /// Any name in the set
    AnyOf(Vec<String>),
    /// Names starting with this prefix
    Prefix(String),
}

impl RuleMatcher {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            RuleMatcher::Exact(key) => key == name,
            RuleMatcher::AnyOf(keys) => keys.iter().any(|k| k == name),
            RuleMatcher::Prefix(prefix) => name.starts_with(prefix.as_str()),
        }
    }
}

/// A single table entry
pub struct Rule {
    name: String,
    matcher: RuleMatcher,
    handler: RuleHandler,
    terminal: bool,
}

impl Rule {
    /// A rule that ends the pipeline when it matches
    pub fn terminal<F>(name: impl Into<String>, matcher: RuleMatcher, handler: F) -> Self
    where
        F: Fn(&VariableUpdateEvent, &mut RuleContext<'_>) + Send + 'static,
    {
        Self {
            name: name.into(),
            matcher,
            handler: Box::new(handler),
            terminal: true,
        }
    }

    /// A rule that lets later stages see the event too
    pub fn passthrough<F>(name: impl Into<String>, matcher: RuleMatcher, handler: F) -> Self
    where
        F: Fn(&VariableUpdateEvent, &mut RuleContext<'_>) + Send + 'static,
    {
        Self {
            terminal: false,
            ..Self::terminal(name, matcher, handler)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matcher(&self) -> &RuleMatcher {
        &self.matcher
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("matcher", &self.matcher)
            .field("terminal", &self.terminal)
            .finish()
    }
}

/// Result of running the table against one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
    /// No rule matched
    NoMatch,
    /// A rule matched and its handler ran
    Matched { terminal: bool },
}

impl RuleOutcome {
    /// True if the dispatcher must stop after this stage
    pub fn stops_pipeline(&self) -> bool {
        matches!(self, RuleOutcome::Matched { terminal: true })
    }
}

/// Ordered rule table
#[derive(Debug, Default)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    /// An empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule; earlier rules take precedence
    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Builder form of [`RuleTable::push`]
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.push(rule);
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First rule matching `name`
    pub fn find(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.matcher.matches(name))
    }

    /// Run the first matching rule's handler
    pub fn apply(&self, event: &VariableUpdateEvent, ctx: &mut RuleContext<'_>) -> RuleOutcome {
        match self.find(&event.name) {
            Some(rule) => {
                tracing::trace!("Rule '{}' matched {}", rule.name, event.name);
                (rule.handler)(event, ctx);
                RuleOutcome::Matched {
                    terminal: rule.terminal,
                }
            }
            None => RuleOutcome::NoMatch,
        }
    }

    /// The built-in terminal rules
    pub fn builtin() -> Self {
        Self::new()
            .with_rule(Rule::terminal(
                "flight-phase",
                RuleMatcher::Exact(FLIGHT_PHASE_KEY.to_string()),
                flight_phase,
            ))
            .with_rule(Rule::terminal(
                "hotkey-readback",
                RuleMatcher::AnyOf(HOTKEY_READBACK.iter().map(|(k, _)| k.to_string()).collect()),
                hotkey_readback,
            ))
            .with_rule(Rule::terminal(
                "guidance-status",
                RuleMatcher::AnyOf(GUIDANCE_STATUS.iter().map(|k| k.to_string()).collect()),
                guidance_status,
            ))
            .with_rule(Rule::terminal(
                "led-state",
                RuleMatcher::Prefix(LED_PREFIX.to_string()),
                led_state,
            ))
    }
}

fn flight_phase(event: &VariableUpdateEvent, ctx: &mut RuleContext<'_>) {
    let phase = ctx
        .registry
        .definition(&event.name)
        .and_then(|def| def.describe(event.value))
        .map(str::to_string)
        .unwrap_or_else(|| format!("phase {}", format_value(event.value)));

    if ctx.flight.phase.as_deref() == Some(phase.as_str()) {
        return;
    }

    ctx.flight.phase = Some(phase.clone());
    ctx.ui.set_window_title(&ctx.flight.title());
    if !event.is_initial_value {
        ctx.announcer
            .announce_with_queue(&format!("Entering {} phase", phase));
    }
    tracing::info!("Flight phase: {}", phase);
}

fn hotkey_readback(event: &VariableUpdateEvent, ctx: &mut RuleContext<'_>) {
    let label = ctx
        .registry
        .definition(&event.name)
        .map(|def| def.display_name.clone())
        .or_else(|| {
            HOTKEY_READBACK
                .iter()
                .find(|(key, _)| *key == event.name)
                .map(|(_, label)| label.to_string())
        })
        .unwrap_or_else(|| event.name.clone());

    let spoken = ctx
        .registry
        .definition(&event.name)
        .and_then(|def| def.describe(event.value))
        .map(str::to_string)
        .unwrap_or_else(|| format_value(event.value));

    ctx.announcer
        .announce_immediate(&format!("{} {}", label, spoken));
}

fn guidance_status(event: &VariableUpdateEvent, ctx: &mut RuleContext<'_>) {
    let previous = ctx.flight.guidance.insert(event.name.clone(), event.value);
    if event.is_initial_value || previous.is_some_and(|prev| same_value(prev, event.value)) {
        return;
    }
    let text = match ctx.registry.definition(&event.name) {
        Some(def) => def.spoken_value(event.value),
        None => format!("{}: {}", event.name, format_value(event.value)),
    };
    ctx.announcer.announce(&text);
}

fn led_state(event: &VariableUpdateEvent, ctx: &mut RuleContext<'_>) {
    let lit = event.value != 0.0;
    let previous = ctx.flight.leds.insert(event.name.clone(), lit);
    if event.is_initial_value || previous == Some(lit) {
        return;
    }
    let name = ctx
        .registry
        .definition(&event.name)
        .map(|def| def.display_name.clone())
        .unwrap_or_else(|| {
            event
                .name
                .trim_start_matches(LED_PREFIX)
                .replace('_', " ")
                .to_lowercase()
        });
    ctx.announcer
        .announce(&format!("{} {}", name, if lit { "on" } else { "off" }));
}
