//! Stimulus Waveforms
//!
//! A waveform is a paired series of time samples (ms, strictly
//! non-decreasing) and current amplitudes (nA), interpolated linearly by
//! the engine when it drives a point source. Outside the sampled range
//! the source holds the first sample's value before onset (in practice 0,
//! since waveforms start at zero current) and delivers 0 after the last
//! sample.
//!
//! Waveforms are validated at construction, so everything downstream can
//! assume a well-formed series.

use serde::{Deserialize, Serialize};

use crate::error::{MyelinError, Result};

/// A time-varying current waveform
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Waveform {
    times_ms: Vec<f64>,
    amps_na: Vec<f64>,
}

impl Waveform {
    /// Validate and wrap a (time, amplitude) series
    ///
    /// Requires equal lengths ≥ 2 and strictly non-decreasing times.
    pub fn new(times_ms: Vec<f64>, amps_na: Vec<f64>) -> Result<Self> {
        if times_ms.len() != amps_na.len() {
            return Err(MyelinError::InvalidWaveform(format!(
                "time and amplitude series differ in length: {} vs {}",
                times_ms.len(),
                amps_na.len()
            )));
        }
        if times_ms.len() < 2 {
            return Err(MyelinError::InvalidWaveform(format!(
                "waveform needs at least 2 samples, got {}",
                times_ms.len()
            )));
        }
        if times_ms.windows(2).any(|w| w[1] < w[0]) {
            return Err(MyelinError::InvalidWaveform(
                "time samples must be non-decreasing".to_string(),
            ));
        }
        if times_ms.iter().chain(amps_na.iter()).any(|x| !x.is_finite()) {
            return Err(MyelinError::InvalidWaveform(
                "waveform samples must be finite".to_string(),
            ));
        }
        Ok(Self { times_ms, amps_na })
    }

    /// Rectangular current pulse sampled over a window
    ///
    /// Amplitude `amplitude_na` between `onset_ms` and `onset_ms +
    /// width_ms`, zero elsewhere, sampled every `dt_ms` across
    /// `[0, window_ms)`.
    pub fn rectangular_pulse(
        onset_ms: f64,
        width_ms: f64,
        amplitude_na: f64,
        window_ms: f64,
        dt_ms: f64,
    ) -> Result<Self> {
        if dt_ms <= 0.0 || window_ms <= dt_ms {
            return Err(MyelinError::InvalidWaveform(format!(
                "pulse window {} ms must span several steps of {} ms",
                window_ms, dt_ms
            )));
        }
        let steps = (window_ms / dt_ms).ceil() as usize;
        let mut times_ms = Vec::with_capacity(steps);
        let mut amps_na = Vec::with_capacity(steps);
        for k in 0..steps {
            let t = k as f64 * dt_ms;
            times_ms.push(t);
            let on = t >= onset_ms && t < onset_ms + width_ms;
            amps_na.push(if on { amplitude_na } else { 0.0 });
        }
        Self::new(times_ms, amps_na)
    }

    /// Fresh waveform with every amplitude multiplied by `scale`
    pub fn scaled(&self, scale: f64) -> Self {
        Self {
            times_ms: self.times_ms.clone(),
            amps_na: self.amps_na.iter().map(|a| a * scale).collect(),
        }
    }

    /// Time of the last sample (ms)
    pub fn end_time_ms(&self) -> f64 {
        *self.times_ms.last().unwrap_or(&0.0)
    }

    /// Time samples (ms)
    pub fn times_ms(&self) -> &[f64] {
        &self.times_ms
    }

    /// Amplitude samples (nA)
    pub fn amps_na(&self) -> &[f64] {
        &self.amps_na
    }

    /// Source current at time `t` (nA)
    ///
    /// Piecewise-linear between samples, the first sample's value before
    /// the series starts, 0 after it ends.
    pub fn amplitude_at(&self, t_ms: f64) -> f64 {
        if t_ms <= self.times_ms[0] {
            return self.amps_na[0];
        }
        if t_ms > self.end_time_ms() {
            return 0.0;
        }
        let hi = self.times_ms.partition_point(|&t| t < t_ms);
        let lo = hi - 1;
        let (t0, t1) = (self.times_ms[lo], self.times_ms[hi]);
        let (a0, a1) = (self.amps_na[lo], self.amps_na[hi]);
        if t1 == t0 {
            return a1;
        }
        a0 + (a1 - a0) * (t_ms - t0) / (t1 - t0)
    }
}
