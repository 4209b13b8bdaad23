//! Simulator side of the bridge
//!
//! - [`UpdateSink`] - enqueue-only handle for interconnect callbacks
//! - [`VariableRequester`] - asks the simulator to resend values
//! - [`MockSimulator`] - pattern-driven stand-in (feature `mock-sim`)

pub mod source;
#[cfg(feature = "mock-sim")]
pub mod mock;

pub use source::{NullRequester, UpdateSink, VariableRequester};

#[cfg(feature = "mock-sim")]
pub use mock::{demo_variables, MockRequester, MockSimulator, SimPattern, SimRequest, SimVariable};

#[cfg(test)]
pub use source::MockVariableRequester;
