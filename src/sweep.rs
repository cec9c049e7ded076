//! Diameter Sweep - Threshold vs Fiber Caliber
//!
//! Runs the threshold search across a set of fiber diameters and collects
//! the diameter → threshold map. Every diameter gets its own fiber and
//! its own engine instance, run strictly sequentially: the engine holds
//! instance-wide mutable state, so trials never share one.
//!
//! A solver failure aborts only the fiber it occurred on; the remaining
//! diameters still run, and the failed entry records the error detail.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::cable::FiberBuilder;
use crate::engine::{CableEngine, DEFAULT_DT_MS};
use crate::error::Result;
use crate::search::{SearchConfig, ThresholdOutcome, ThresholdSearch};
use crate::stimulus::Waveform;

/// Rectangular test pulse parameters
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PulseConfig {
    /// Pulse onset (ms)
    pub onset_ms: f64,
    /// Pulse width (ms)
    pub width_ms: f64,
    /// Base amplitude the search scales (nA)
    pub amplitude_na: f64,
    /// Sampled waveform window (ms)
    pub window_ms: f64,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            onset_ms: 0.2,
            width_ms: 0.2,
            amplitude_na: 1.0,
            window_ms: 5.0,
        }
    }
}

impl PulseConfig {
    /// Sample the pulse at the solver step size
    pub fn waveform(&self) -> Result<Waveform> {
        Waveform::rectangular_pulse(
            self.onset_ms,
            self.width_ms,
            self.amplitude_na,
            self.window_ms,
            DEFAULT_DT_MS,
        )
    }
}

/// Sweep configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Fiber diameters to test (µm)
    pub diameters_um: Vec<f64>,
    /// Nodes of Ranvier per fiber
    pub node_count: usize,
    /// Test pulse
    pub pulse: PulseConfig,
    /// Bisection parameters
    pub search: SearchConfig,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            diameters_um: vec![2.0, 5.0, 8.0],
            node_count: 31,
            pulse: PulseConfig::default(),
            search: SearchConfig {
                scale_lo: 0.0,
                scale_hi: 2000.0,
                tolerance: 0.1,
                ..SearchConfig::default()
            },
        }
    }
}

/// One sweep result
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SweepEntry {
    /// Fiber diameter (µm)
    pub diameter_um: f64,
    /// Threshold scale factor; None when not bracketed or the fiber's
    /// search failed
    pub threshold: Option<f64>,
    /// Outcome description for inspection
    pub detail: String,
}

/// Run the threshold search for every configured diameter
pub fn run_sweep(config: &SweepConfig) -> Result<Vec<SweepEntry>> {
    let base = config.pulse.waveform()?;
    let search = ThresholdSearch::new(config.search.clone());
    let mut entries = Vec::with_capacity(config.diameters_um.len());

    for &diameter in &config.diameters_um {
        let fiber = FiberBuilder::new(diameter, config.node_count).build()?;
        let mut engine = CableEngine::for_fiber(&fiber)?;
        info!(
            "searching threshold: diameter {} µm, {} nodes",
            diameter, config.node_count
        );

        let entry = match search.run(&mut engine, &fiber, &base) {
            Ok(ThresholdOutcome::Threshold { scale, trials, .. }) => SweepEntry {
                diameter_um: diameter,
                threshold: Some(scale),
                detail: format!(
                    "threshold scale {:.3} (peak {:.3} nA) in {} trials",
                    scale,
                    scale * config.pulse.amplitude_na,
                    trials
                ),
            },
            Ok(ThresholdOutcome::NotBracketed) => SweepEntry {
                diameter_um: diameter,
                threshold: None,
                detail: format!(
                    "not bracketed: scale {} did not evoke firing",
                    config.search.scale_hi
                ),
            },
            Err(e) => {
                warn!("sweep entry for {} µm failed: {}", diameter, e);
                SweepEntry {
                    diameter_um: diameter,
                    threshold: None,
                    detail: format!("solver failure: {e}"),
                }
            }
        };
        entries.push(entry);
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_config_serialization() {
        let config = SweepConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let restored: SweepConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, restored);
    }

    #[test]
    fn test_sweep_isolated_entries() {
        // Small fibers keep the test quick; entries come back in input
        // order with one record per diameter.
        let config = SweepConfig {
            diameters_um: vec![2.0, 5.0],
            node_count: 5,
            ..SweepConfig::default()
        };
        let entries = run_sweep(&config).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].diameter_um, 2.0);
        assert_eq!(entries[1].diameter_um, 5.0);
        for entry in &entries {
            if let Some(t) = entry.threshold {
                assert!(t > 0.0 && t <= config.search.scale_hi);
            }
        }
    }

    #[test]
    fn test_sweep_rejects_bad_topology() {
        let config = SweepConfig {
            node_count: 1,
            ..SweepConfig::default()
        };
        assert!(run_sweep(&config).is_err());
    }
}
