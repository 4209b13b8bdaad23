//! Real-time update dispatch
//!
//! ```text
//! simulator callback ──► EventQueue ──► BatchScheduler ──► UpdateDispatcher
//!   (producer)          (bounded,        (33 ms tick,       (7 stages,
//!                        drop newest)     50 per tick)       consumer only)
//! ```
//!
//! - [`queue`] - bounded multi-producer queue with overflow counters
//! - [`scheduler`] - fixed-cadence batch drain
//! - [`dispatcher`] - per-event routing through the pipeline stages
//! - [`rules`] - ordered terminal rule table
//! - [`profile`] - aircraft-specific interception
//! - [`display`] - panel value cache and refresh fan-in
//! - [`pending`] - one-shot state announcements
//! - [`monitor`] - change detection for continuous variables
//! - [`debounce`] - restart-on-activity rebuild scheduling

pub mod debounce;
pub mod dispatcher;
pub mod display;
pub mod monitor;
pub mod pending;
pub mod profile;
pub mod queue;
pub mod rules;
pub mod scheduler;

pub use debounce::Debouncer;
pub use dispatcher::{StageCounters, UpdateDispatcher};
pub use display::{DisplayAggregator, DisplayRefresh, RefreshOutcome};
pub use monitor::ContinuousMonitor;
pub use pending::PendingAnnouncements;
pub use profile::{AircraftProfile, CompositeGroup, CompositeProfile, NoProfile, ProfileContext};
pub use queue::EventQueue;
pub use rules::{FlightState, Rule, RuleContext, RuleMatcher, RuleOutcome, RuleTable};
pub use scheduler::{BatchScheduler, UpdateHandler};
