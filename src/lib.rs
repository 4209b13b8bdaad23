//! # SimVox: Flight Simulator Variable Dispatch
//!
//! Turns the stream of simulator variable updates into speech and UI state
//! for screen-reader users. The simulator reports changes on its own callback
//! thread; everything user-facing happens on a single consumer thread.
//!
//! ## Architecture
//!
//! - **Producer**: the simulator callback enqueues into a bounded
//!   [`dispatch::EventQueue`] through an [`sim::UpdateSink`]. When full, the
//!   newest update is dropped and counted.
//! - **Scheduler**: every 33 ms the [`dispatch::BatchScheduler`] drains up to
//!   50 updates and hands them to the [`dispatch::UpdateDispatcher`].
//! - **Dispatcher**: stores the value, then routes it through terminal rules,
//!   the aircraft profile, the display cache, control sync, one-shot
//!   announcements and the continuous monitor.
//! - **Runtime**: [`runtime::BridgeRuntime`] owns the consumer side and talks
//!   to the host UI through crossbeam channels.
//!
//! ## Configuration
//!
//! Tunables are stored as TOML in the platform data directory under
//! `dev.simvox` (see [`config`]).
//!
//! ## Example
//!
//! ```ignore
//! use simvox::{AppConfig, BridgeRuntime, UpdateDispatcher, StaticRegistry};
//! use simvox::ui::{ChannelAnnouncer, HeadlessSurface};
//! use std::sync::Arc;
//!
//! let config = AppConfig::load_or_default();
//! let (announcer, speech) = ChannelAnnouncer::new();
//! let dispatcher = UpdateDispatcher::new(
//!     &config,
//!     Arc::new(StaticRegistry::load("a32nx.json")?),
//!     Box::new(announcer),
//!     Box::new(HeadlessSurface),
//! );
//! let (runtime, bridge) = BridgeRuntime::new(config, dispatcher);
//! let sink = runtime.sink();
//! std::thread::spawn(move || runtime.run());
//!
//! bridge.connect();
//! sink.push_value("A32NX_FMGC_FLIGHT_PHASE", 4.0);
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod registry;
pub mod runtime;
pub mod sim;
pub mod types;
pub mod ui;

// Re-export commonly used types
pub use config::AppConfig;
pub use dispatch::{BatchScheduler, EventQueue, UpdateDispatcher};
pub use error::{Result, SimVoxError};
pub use registry::{StaticRegistry, VariableRegistry};
pub use runtime::{BridgeRuntime, RuntimeBridge, RuntimeCommand, RuntimeMessage};
pub use sim::UpdateSink;
pub use types::{VariableDefinition, VariableUpdateEvent};
