//! # Simulation Engine - The Solver Boundary
//!
//! Everything the threshold search needs from a time-stepping solver is
//! behind the [`Simulator`] trait:
//!
//! - load a fiber topology (declare compartments, attach mechanisms,
//!   connect them into the chain)
//! - attach/release a current waveform at a compartment midpoint
//! - attach a voltage probe at a compartment midpoint
//! - initialize all state to a uniform membrane potential
//! - run from t = 0 to a stop time at a fixed step
//! - read back the recorded trace
//!
//! [`CableEngine`] is the reference implementation: an implicit
//! (backward-Euler) voltage solve over the unbranched compartment chain
//! with explicit gating updates. The solver holds instance-wide mutable
//! state (clock, voltages, gates), so one engine must never run two
//! trials concurrently; independent fibers get independent engines.
//!
//! Lifecycle contract: `initialize` must precede the first `run`, and
//! every trial re-initializes so no state leaks across trials. Stimulus
//! handles are scoped to one trial - release them before attaching the
//! next, or the old waveform keeps driving its compartment.

use serde::{Deserialize, Serialize};

use crate::cable::{CompartmentId, Fiber};
use crate::error::Result;
use crate::stimulus::Waveform;

// Nodal channel gating
mod membrane;

// Reference implicit cable solver
mod cable_engine;
pub use cable_engine::CableEngine;

/// Fixed solver step size (ms)
pub const DEFAULT_DT_MS: f64 = 0.025;

/// Handle to an attached stimulus, scoped to one trial
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StimulusHandle(pub(crate) usize);

/// Handle to an attached voltage probe
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProbeHandle(pub(crate) usize);

/// Membrane potential recorded at every solver step of a run
///
/// Covers the whole run with no gaps: `values[k]` is the potential at
/// `t = k · dt`, including the initial sample at t = 0.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    /// Step size the run used (ms)
    pub dt_ms: f64,
    /// Potential at each step (mV)
    pub values_mv: Vec<f64>,
}

impl Trace {
    /// Sample times (ms)
    pub fn times_ms(&self) -> impl Iterator<Item = f64> + '_ {
        self.values_mv
            .iter()
            .enumerate()
            .map(move |(k, _)| k as f64 * self.dt_ms)
    }

    /// Largest recorded potential (mV)
    pub fn peak_mv(&self) -> f64 {
        self.values_mv
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Time-stepping solver for a compartment chain
///
/// The search drives this trait only; swapping the reference engine for
/// an external solver binding means implementing these seven operations.
pub trait Simulator {
    /// Declare, parameterize, and connect every compartment of `fiber`
    ///
    /// Replaces any previously loaded topology along with its stimuli and
    /// probes.
    fn load(&mut self, fiber: &Fiber) -> Result<()>;

    /// Attach a current source at the midpoint of `compartment`
    ///
    /// The waveform drives the source until the handle is released; keep
    /// the handle for the duration of the trial.
    fn attach_stimulus(
        &mut self,
        compartment: CompartmentId,
        waveform: &Waveform,
    ) -> Result<StimulusHandle>;

    /// Release a stimulus; its waveform stops contributing current
    fn release_stimulus(&mut self, handle: StimulusHandle);

    /// Attach a voltage probe at the midpoint of `compartment`
    ///
    /// Probes survive across trials; each run rebuilds every probe's
    /// trace from scratch.
    fn attach_probe(&mut self, compartment: CompartmentId) -> Result<ProbeHandle>;

    /// Reset the clock and set every state variable to a uniform
    /// membrane potential
    ///
    /// Must be called before every run.
    fn initialize(&mut self, v_init_mv: f64);

    /// Advance from t = 0 to `t_stop_ms` at fixed step `dt_ms`
    fn run(&mut self, t_stop_ms: f64, dt_ms: f64) -> Result<()>;

    /// Trace recorded by `probe` during the last run
    fn trace(&self, probe: ProbeHandle) -> Result<&Trace>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_peak() {
        let trace = Trace {
            dt_ms: 0.025,
            values_mv: vec![-80.0, -40.0, 12.5, -60.0],
        };
        assert_eq!(trace.peak_mv(), 12.5);
        let times: Vec<f64> = trace.times_ms().collect();
        assert_eq!(times, vec![0.0, 0.025, 0.05, 0.075]);
    }

    #[test]
    fn test_trace_serialization() {
        let trace = Trace {
            dt_ms: 0.025,
            values_mv: vec![-80.0, -79.5],
        };
        let json = serde_json::to_string(&trace).unwrap();
        let restored: Trace = serde_json::from_str(&json).unwrap();
        assert_eq!(trace, restored);
    }
}
