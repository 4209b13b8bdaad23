//! Mock simulator for running without Microsoft Flight Simulator
//!
//! Generates variable updates from simple patterns on its own thread and
//! answers value requests with initial-value updates, the same way the real
//! interconnect does. Useful for the demo binary, integration tests and
//! load experiments against the bounded queue.

use crate::sim::source::{UpdateSink, VariableRequester};
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Value generation pattern for a mock variable
#[derive(Debug, Clone, PartialEq)]
pub enum SimPattern {
    /// Never changes
    Constant(f64),
    /// Sine wave around `offset`
    Sine {
        frequency: f64,
        amplitude: f64,
        offset: f64,
    },
    /// Counter wrapping between `min` and `max`
    Counter { step: f64, min: f64, max: f64 },
    /// Cycles through `values`, holding each for `hold_secs`
    Steps { values: Vec<f64>, hold_secs: f64 },
    /// Pseudo random value within range
    Random { min: f64, max: f64 },
}

impl Default for SimPattern {
    fn default() -> Self {
        SimPattern::Constant(0.0)
    }
}

/// A variable the mock simulator reports
#[derive(Debug, Clone)]
pub struct SimVariable {
    pub key: String,
    pub pattern: SimPattern,
    /// Values are rounded to this step before being reported (0 = exact)
    pub resolution: f64,
    counter_value: f64,
}

impl SimVariable {
    pub fn new(key: impl Into<String>, pattern: SimPattern) -> Self {
        Self {
            key: key.into(),
            pattern,
            resolution: 0.0,
            counter_value: 0.0,
        }
    }

    /// Round reported values to `step`
    pub fn with_resolution(mut self, step: f64) -> Self {
        self.resolution = step;
        self
    }

    /// Value at `elapsed_secs` since the simulator started
    pub fn generate_value(&mut self, elapsed_secs: f64) -> f64 {
        let value = match &self.pattern {
            SimPattern::Constant(v) => *v,
            SimPattern::Sine {
                frequency,
                amplitude,
                offset,
            } => offset + amplitude * (2.0 * std::f64::consts::PI * frequency * elapsed_secs).sin(),
            SimPattern::Counter { step, min, max } => {
                self.counter_value += step;
                if self.counter_value > *max {
                    self.counter_value = *min;
                } else if self.counter_value < *min {
                    self.counter_value = *max;
                }
                self.counter_value
            }
            SimPattern::Steps { values, hold_secs } => {
                if values.is_empty() {
                    0.0
                } else {
                    let hold = hold_secs.max(f64::EPSILON);
                    let index = (elapsed_secs / hold) as usize % values.len();
                    values[index]
                }
            }
            SimPattern::Random { min, max } => min + rand_simple() * (max - min),
        };

        if self.resolution > 0.0 {
            (value / self.resolution).round() * self.resolution
        } else {
            value
        }
    }
}

/// Xorshift generator, good enough for demo noise
fn rand_simple() -> f64 {
    use std::cell::Cell;
    thread_local! {
        static SEED: Cell<u64> = const { Cell::new(0x5EED_1234) };
    }
    SEED.with(|seed| {
        let mut s = seed.get();
        s ^= s << 13;
        s ^= s >> 7;
        s ^= s << 17;
        seed.set(s);
        (s as f64) / (u64::MAX as f64)
    })
}

/// Request forwarded from the consumer to the mock simulator thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimRequest {
    Variable(String),
    Keys(Vec<String>),
    All,
}

/// [`VariableRequester`] backed by a [`MockSimulator`]
#[derive(Debug, Clone)]
pub struct MockRequester {
    tx: Sender<SimRequest>,
}

impl VariableRequester for MockRequester {
    fn request_variable(&mut self, key: &str) {
        let _ = self.tx.send(SimRequest::Variable(key.to_string()));
    }

    fn request_panel(&mut self, _panel: &str, keys: &[String]) {
        let _ = self.tx.send(SimRequest::Keys(keys.to_vec()));
    }

    fn request_all(&mut self) {
        let _ = self.tx.send(SimRequest::All);
    }
}

/// Pattern-driven simulator producing into an [`UpdateSink`]
pub struct MockSimulator {
    sink: UpdateSink,
    variables: Vec<SimVariable>,
    last_reported: HashMap<String, f64>,
    requests: Receiver<SimRequest>,
    rate_hz: u32,
    running: Arc<AtomicBool>,
}

impl MockSimulator {
    /// Create a simulator and the requester that talks to it
    pub fn new(sink: UpdateSink, rate_hz: u32) -> (Self, MockRequester) {
        let (tx, rx) = unbounded();
        let sim = Self {
            sink,
            variables: Vec::new(),
            last_reported: HashMap::new(),
            requests: rx,
            rate_hz,
            running: Arc::new(AtomicBool::new(true)),
        };
        (sim, MockRequester { tx })
    }

    pub fn with_variable(mut self, variable: SimVariable) -> Self {
        self.variables.push(variable);
        self
    }

    pub fn with_variables(mut self, variables: impl IntoIterator<Item = SimVariable>) -> Self {
        self.variables.extend(variables);
        self
    }

    /// Flag that stops [`MockSimulator::run`] when cleared
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Answer pending requests and report changed values.
    ///
    /// Returns the number of events the sink accepted.
    pub fn tick(&mut self, elapsed: Duration) -> usize {
        let secs = elapsed.as_secs_f64();
        let mut accepted = self.answer_requests(secs);

        for variable in &mut self.variables {
            let value = variable.generate_value(secs);
            if self.last_reported.get(&variable.key) == Some(&value) {
                continue;
            }
            if self.sink.push_value(&variable.key, value) {
                accepted += 1;
                self.last_reported.insert(variable.key.clone(), value);
            }
        }
        accepted
    }

    fn answer_requests(&mut self, secs: f64) -> usize {
        let mut accepted = 0;
        loop {
            let request = match self.requests.try_recv() {
                Ok(request) => request,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            };
            let keys: Vec<String> = match request {
                SimRequest::Variable(key) => vec![key],
                SimRequest::Keys(keys) => keys,
                SimRequest::All => self.variables.iter().map(|v| v.key.clone()).collect(),
            };
            for key in keys {
                let Some(variable) = self.variables.iter_mut().find(|v| v.key == key) else {
                    tracing::debug!("Mock simulator has no variable {}", key);
                    continue;
                };
                let value = variable.generate_value(secs);
                if self.sink.push_initial(&key, value) {
                    accepted += 1;
                    self.last_reported.insert(key, value);
                }
            }
        }
        accepted
    }

    /// Produce until the stop handle is cleared
    pub fn run(mut self) {
        tracing::info!(
            "Mock simulator started ({} variables at {} Hz)",
            self.variables.len(),
            self.rate_hz
        );
        let start = Instant::now();
        let interval = Duration::from_micros(1_000_000 / u64::from(self.rate_hz.max(1)));
        let mut next = start;

        while self.running.load(Ordering::SeqCst) {
            self.tick(start.elapsed());
            next += interval;
            let now = Instant::now();
            if next > now {
                std::thread::sleep(next - now);
            } else {
                next = now;
            }
        }
        tracing::info!("Mock simulator stopped");
    }
}

impl std::fmt::Debug for MockSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSimulator")
            .field("variables", &self.variables.len())
            .field("rate_hz", &self.rate_hz)
            .finish_non_exhaustive()
    }
}

/// A small A32NX-flavored variable set
pub fn demo_variables() -> Vec<SimVariable> {
    vec![
        SimVariable::new(
            "A32NX_FMGC_FLIGHT_PHASE",
            SimPattern::Steps {
                values: vec![1.0, 2.0, 3.0, 4.0, 5.0],
                hold_secs: 20.0,
            },
        ),
        SimVariable::new(
            "A32NX_AUTOPILOT_HEADING_SELECTED",
            SimPattern::Counter {
                step: 1.0,
                min: 0.0,
                max: 359.0,
            },
        ),
        SimVariable::new(
            "A32NX_AUTOPILOT_SPEED_SELECTED",
            SimPattern::Sine {
                frequency: 0.02,
                amplitude: 30.0,
                offset: 250.0,
            },
        )
        .with_resolution(1.0),
        SimVariable::new(
            "A32NX_GEAR_HANDLE_POSITION",
            SimPattern::Steps {
                values: vec![1.0, 0.0],
                hold_secs: 30.0,
            },
        ),
        SimVariable::new(
            "LED_MASTER_CAUTION",
            SimPattern::Steps {
                values: vec![0.0, 0.0, 1.0],
                hold_secs: 7.0,
            },
        ),
        SimVariable::new(
            "AMBIENT_WIND_DIRECTION",
            SimPattern::Steps {
                values: vec![270.0, 280.0, 250.0],
                hold_secs: 15.0,
            },
        ),
        SimVariable::new(
            "AMBIENT_WIND_VELOCITY",
            SimPattern::Steps {
                values: vec![15.0, 20.0, 10.0],
                hold_secs: 15.0,
            },
        ),
        SimVariable::new("AMBIENT_TEMPERATURE", SimPattern::Random { min: -5.0, max: 5.0 })
            .with_resolution(1.0),
    ]
}
