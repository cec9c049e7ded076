//! Threshold Search - Bisection over Stimulus Scale
//!
//! Finds the smallest multiplier on a base current waveform that evokes a
//! propagated action potential at the recording node. Each trial attaches
//! a freshly scaled stimulus at the mid-fiber node, re-initializes the
//! engine to the fiber's resting potential, runs past the end of the
//! waveform, and classifies the recorded trace.
//!
//! The search assumes firing is monotone non-decreasing in stimulus
//! scale. That assumption is NOT verified here - it is a precondition on
//! the waveform shape and fiber; violating it produces a meaningless
//! result without any detectable error.
//!
//! The converged estimate is the bracket's upper edge: the smallest scale
//! known to fire, conservative by at most the tolerance.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::cable::Fiber;
use crate::engine::{Simulator, Trace, DEFAULT_DT_MS};
use crate::error::Result;
use crate::stimulus::Waveform;

/// Classifies a recorded trace as fired / not fired
///
/// The default compares the trace peak against a fixed depolarization
/// level. A peak criterion cannot distinguish a genuine propagated spike
/// from strong local depolarization at the recording site; implementations
/// with stricter criteria plug in here.
pub trait SpikeDetector {
    /// True iff the trace contains an action potential
    fn fired(&self, trace: &Trace) -> bool;
}

/// Peak-depolarization detector
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeakDetector {
    /// Firing level the peak must exceed (mV)
    pub threshold_mv: f64,
}

impl Default for PeakDetector {
    fn default() -> Self {
        Self { threshold_mv: 0.0 }
    }
}

impl SpikeDetector for PeakDetector {
    fn fired(&self, trace: &Trace) -> bool {
        trace.peak_mv() > self.threshold_mv
    }
}

/// Bisection search configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Scale known (or assumed) not to fire
    pub scale_lo: f64,
    /// Scale expected to fire
    pub scale_hi: f64,
    /// Stop once the bracket is narrower than this
    pub tolerance: f64,
    /// Trial budget after the bracket checks
    pub max_iterations: usize,
    /// Node-list index to record at; None = distal node
    pub record_node: Option<usize>,
    /// Solver step size (ms)
    pub dt_ms: f64,
    /// Settling time simulated past the end of the waveform (ms)
    pub tail_ms: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            scale_lo: 0.0,
            scale_hi: 1000.0,
            tolerance: 1.0e-2,
            max_iterations: 20,
            record_node: None,
            dt_ms: DEFAULT_DT_MS,
            tail_ms: 5.0,
        }
    }
}

/// Result of a threshold search
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ThresholdOutcome {
    /// Converged (or budget-exhausted) threshold estimate
    Threshold {
        /// Smallest known-firing scale (the bracket's upper edge)
        scale: f64,
        /// Final non-firing lower edge
        lo: f64,
        /// Final firing upper edge
        hi: f64,
        /// Trials spent, bracket checks included
        trials: usize,
    },
    /// The upper scale bound failed to evoke firing; widen the bracket
    NotBracketed,
}

impl ThresholdOutcome {
    /// Threshold estimate, if the bracket held
    pub fn scale(&self) -> Option<f64> {
        match self {
            Self::Threshold { scale, .. } => Some(*scale),
            Self::NotBracketed => None,
        }
    }

    /// True iff the search produced an estimate
    pub fn is_bracketed(&self) -> bool {
        matches!(self, Self::Threshold { .. })
    }
}

/// Bisection threshold search over a fiber and base waveform
#[derive(Clone, Debug)]
pub struct ThresholdSearch<D: SpikeDetector = PeakDetector> {
    config: SearchConfig,
    detector: D,
}

impl ThresholdSearch<PeakDetector> {
    /// Search with the default peak detector
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            detector: PeakDetector::default(),
        }
    }
}

impl<D: SpikeDetector> ThresholdSearch<D> {
    /// Search with a custom firing detector
    pub fn with_detector(config: SearchConfig, detector: D) -> Self {
        Self { config, detector }
    }

    /// The active configuration
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Run the bisection against `sim`, which must already have `fiber`
    /// loaded
    ///
    /// Returns `NotBracketed` when `scale_hi` fails to fire. Returns the
    /// lower bound directly when it already fires. Solver failures abort
    /// the remaining trials and propagate.
    pub fn run<S: Simulator>(
        &self,
        sim: &mut S,
        fiber: &Fiber,
        base: &Waveform,
    ) -> Result<ThresholdOutcome> {
        let record_node = self.config.record_node.unwrap_or(fiber.recording_node());
        let record_site = fiber.node(record_node).ok_or_else(|| {
            crate::error::MyelinError::InvalidTopology(format!(
                "record node {} out of range for {}-node fiber",
                record_node,
                fiber.node_count()
            ))
        })?;

        // One probe for the whole search; every run rebuilds its trace.
        let probe = sim.attach_probe(record_site)?;
        let stim_site = fiber.stimulation_site();
        let v_rest = fiber.rest_potential();
        let t_stop = base.end_time_ms() + self.config.tail_ms;
        let mut trials = 0usize;

        let fires = |sim: &mut S, scale: f64, trials: &mut usize| -> Result<bool> {
            *trials += 1;
            let stim = sim.attach_stimulus(stim_site, &base.scaled(scale))?;
            sim.initialize(v_rest);
            let outcome = sim.run(t_stop, self.config.dt_ms);
            sim.release_stimulus(stim);
            outcome?;
            let fired = self.detector.fired(sim.trace(probe)?);
            debug!("trial {}: scale {:.4} -> fired = {}", *trials, scale, fired);
            Ok(fired)
        };

        let (mut lo, mut hi) = (self.config.scale_lo, self.config.scale_hi);

        if !fires(sim, hi, &mut trials)? {
            warn!(
                "upper scale bound {:.4} did not evoke firing; widen the bracket",
                hi
            );
            return Ok(ThresholdOutcome::NotBracketed);
        }
        if fires(sim, lo, &mut trials)? {
            // Threshold is at or below the lower bound.
            return Ok(ThresholdOutcome::Threshold {
                scale: lo,
                lo,
                hi: lo,
                trials,
            });
        }

        for _ in 0..self.config.max_iterations {
            if hi - lo < self.config.tolerance {
                break;
            }
            let mid = 0.5 * (lo + hi);
            if fires(sim, mid, &mut trials)? {
                hi = mid;
            } else {
                lo = mid;
            }
        }

        Ok(ThresholdOutcome::Threshold {
            scale: hi,
            lo,
            hi,
            trials,
        })
    }
}
