//! Reference Cable Solver
//!
//! Implicit time-stepping of the compartment chain. Each step advances the
//! channel gates explicitly at the present voltage, then solves the
//! coupled voltage system backward-Euler:
//!
//! ```text
//! (C_i/dt) V_i' + g_i V_i' - Σ_j g_ij (V_j' - 0) = (C_i/dt) V_i + g_i·E_i + I_inj
//! ```
//!
//! The chain is unbranched, so the system is tridiagonal and solved by a
//! single forward/backward sweep. The implicit voltage step keeps the
//! stiff node/myelin coupling stable at the fixed 0.025 ms step.
//!
//! Units are the self-consistent set mV / ms / nA / nF / µS / MΩ.

use log::{debug, trace as log_trace};

use crate::cable::{CompartmentId, Fiber, Mechanism, PassiveParams};
use crate::error::{MyelinError, Result};
use crate::stimulus::Waveform;

use super::membrane::{passive_conductance_us, NodeChannels};
use super::{ProbeHandle, Simulator, StimulusHandle, Trace};

/// Per-compartment channel state
#[derive(Clone, Debug)]
enum ChannelState {
    Excitable(NodeChannels),
    Passive(PassiveParams),
}

/// Reference implicit solver for an unbranched compartment chain
#[derive(Clone, Debug, Default)]
pub struct CableEngine {
    /// Membrane potential per compartment (mV)
    v_mv: Vec<f64>,
    /// Channel state per compartment
    channels: Vec<ChannelState>,
    /// Membrane area per compartment (cm²)
    area_cm2: Vec<f64>,
    /// Total membrane capacitance per compartment (nF)
    cap_nf: Vec<f64>,
    /// Axial coupling conductance between compartment i and i+1 (µS)
    g_axial_us: Vec<f64>,
    /// Attached stimuli; released slots stay as None
    stimuli: Vec<Option<(CompartmentId, Waveform)>>,
    /// Attached probes and their last-run traces
    probes: Vec<(CompartmentId, Trace)>,
    /// Whether initialize() has seeded the state
    initialized: bool,
    /// Simulation clock (ms)
    time_ms: f64,
}

impl CableEngine {
    /// Empty engine; call [`Simulator::load`] before anything else
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience: new engine with `fiber` already loaded
    pub fn for_fiber(fiber: &Fiber) -> Result<Self> {
        let mut engine = Self::new();
        engine.load(fiber)?;
        Ok(engine)
    }

    /// Current simulation time (ms)
    pub fn time_ms(&self) -> f64 {
        self.time_ms
    }

    /// Number of loaded compartments
    pub fn compartment_count(&self) -> usize {
        self.v_mv.len()
    }

    fn check_compartment(&self, id: CompartmentId) -> Result<()> {
        if id >= self.v_mv.len() {
            return Err(MyelinError::InvalidTopology(format!(
                "compartment {} is not part of the loaded fiber ({} compartments)",
                id,
                self.v_mv.len()
            )));
        }
        Ok(())
    }

    /// Membrane conductance and conductance-weighted reversal of
    /// compartment `i` at its present gate state, as `(Σg, Σg·E)` in µS
    fn membrane_pair(&self, i: usize) -> (f64, f64) {
        match &self.channels[i] {
            ChannelState::Excitable(ch) => ch.conductance_us(self.area_cm2[i]),
            ChannelState::Passive(p) => passive_conductance_us(p, self.area_cm2[i]),
        }
    }
}

impl Simulator for CableEngine {
    fn load(&mut self, fiber: &Fiber) -> Result<()> {
        let n = fiber.compartments.len();

        // The tridiagonal solve needs the arena order to be the chain
        // order: every connection joins consecutive compartments.
        for &(src, dst) in &fiber.connections {
            if dst != src + 1 || dst >= n {
                return Err(MyelinError::InvalidTopology(format!(
                    "connection ({src}, {dst}) does not follow the chain order"
                )));
            }
        }

        self.v_mv = vec![0.0; n];
        self.area_cm2 = fiber.compartments.iter().map(|c| c.area_cm2()).collect();
        self.cap_nf = fiber.compartments.iter().map(|c| c.capacitance_nf()).collect();
        self.channels = fiber
            .compartments
            .iter()
            .map(|c| match c.mechanism {
                Mechanism::Excitable(params) => ChannelState::Excitable(NodeChannels::new(params)),
                Mechanism::Passive(params) => ChannelState::Passive(params),
            })
            .collect();
        self.g_axial_us = fiber
            .connections
            .iter()
            .map(|&(src, dst)| {
                let r_mohm = fiber.compartments[src].half_axial_mohm()
                    + fiber.compartments[dst].half_axial_mohm();
                1.0 / r_mohm
            })
            .collect();
        self.stimuli.clear();
        self.probes.clear();
        self.initialized = false;
        self.time_ms = 0.0;

        debug!("engine loaded {} compartments", n);
        Ok(())
    }

    fn attach_stimulus(
        &mut self,
        compartment: CompartmentId,
        waveform: &Waveform,
    ) -> Result<StimulusHandle> {
        self.check_compartment(compartment)?;
        self.stimuli.push(Some((compartment, waveform.clone())));
        Ok(StimulusHandle(self.stimuli.len() - 1))
    }

    fn release_stimulus(&mut self, handle: StimulusHandle) {
        if let Some(slot) = self.stimuli.get_mut(handle.0) {
            *slot = None;
        }
    }

    fn attach_probe(&mut self, compartment: CompartmentId) -> Result<ProbeHandle> {
        self.check_compartment(compartment)?;
        self.probes.push((compartment, Trace::default()));
        Ok(ProbeHandle(self.probes.len() - 1))
    }

    fn initialize(&mut self, v_init_mv: f64) {
        for v in &mut self.v_mv {
            *v = v_init_mv;
        }
        for ch in &mut self.channels {
            if let ChannelState::Excitable(node) = ch {
                node.initialize(v_init_mv);
            }
        }
        self.time_ms = 0.0;
        self.initialized = true;
    }

    fn run(&mut self, t_stop_ms: f64, dt_ms: f64) -> Result<()> {
        let n = self.v_mv.len();
        if n == 0 {
            return Err(MyelinError::Solver("no fiber loaded".to_string()));
        }
        if !self.initialized {
            return Err(MyelinError::Solver(
                "initialize() must be called before run()".to_string(),
            ));
        }
        if dt_ms <= 0.0 || t_stop_ms <= 0.0 {
            return Err(MyelinError::Solver(format!(
                "run needs positive stop time and step, got t_stop={t_stop_ms} dt={dt_ms}"
            )));
        }

        let steps = (t_stop_ms / dt_ms).ceil() as usize;

        // Every probe's trace covers this run from its first sample.
        for (comp, trace) in &mut self.probes {
            trace.dt_ms = dt_ms;
            trace.values_mv.clear();
            trace.values_mv.reserve(steps + 1);
            trace.values_mv.push(self.v_mv[*comp]);
        }

        // Tridiagonal scratch: diag, upper, rhs, and the sweep buffers.
        let mut diag = vec![0.0; n];
        let mut rhs = vec![0.0; n];
        let mut c_prime = vec![0.0; n];
        let mut d_prime = vec![0.0; n];
        let mut inj_na = vec![0.0; n];

        for k in 1..=steps {
            let t_next = k as f64 * dt_ms;

            // Gates advance explicitly at the present voltage.
            for (i, ch) in self.channels.iter_mut().enumerate() {
                if let ChannelState::Excitable(node) = ch {
                    node.advance(self.v_mv[i], dt_ms);
                }
            }

            // Injected currents for this step.
            for inj in &mut inj_na {
                *inj = 0.0;
            }
            for slot in self.stimuli.iter().flatten() {
                let (comp, waveform) = slot;
                inj_na[*comp] += waveform.amplitude_at(t_next);
            }

            // Assemble the backward-Euler system.
            for i in 0..n {
                let (g_mem, ge_mem) = self.membrane_pair(i);
                let c_over_dt = self.cap_nf[i] / dt_ms;
                let mut g_total = g_mem + c_over_dt;
                if i > 0 {
                    g_total += self.g_axial_us[i - 1];
                }
                if i < n - 1 {
                    g_total += self.g_axial_us[i];
                }
                diag[i] = g_total;
                rhs[i] = c_over_dt * self.v_mv[i] + ge_mem + inj_na[i];
            }

            // Thomas sweep. Sub/super-diagonals are -g_axial_us.
            c_prime[0] = -self.g_axial_us.first().copied().unwrap_or(0.0) / diag[0];
            d_prime[0] = rhs[0] / diag[0];
            for i in 1..n {
                let sub = -self.g_axial_us[i - 1];
                let denom = diag[i] - sub * c_prime[i - 1];
                let upper = if i < n - 1 { -self.g_axial_us[i] } else { 0.0 };
                c_prime[i] = upper / denom;
                d_prime[i] = (rhs[i] - sub * d_prime[i - 1]) / denom;
            }
            self.v_mv[n - 1] = d_prime[n - 1];
            for i in (0..n - 1).rev() {
                self.v_mv[i] = d_prime[i] - c_prime[i] * self.v_mv[i + 1];
            }

            if self.v_mv.iter().any(|v| !v.is_finite()) {
                return Err(MyelinError::Solver(format!(
                    "membrane potential diverged at t = {t_next} ms"
                )));
            }

            for (comp, trace) in &mut self.probes {
                trace.values_mv.push(self.v_mv[*comp]);
            }

            self.time_ms = t_next;
        }

        log_trace!("ran {} steps to t = {} ms", steps, self.time_ms);
        Ok(())
    }

    fn trace(&self, probe: ProbeHandle) -> Result<&Trace> {
        self.probes
            .get(probe.0)
            .map(|(_, trace)| trace)
            .ok_or_else(|| MyelinError::Solver(format!("unknown probe handle {}", probe.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cable::FiberBuilder;
    use crate::engine::DEFAULT_DT_MS;

    fn small_fiber() -> Fiber {
        FiberBuilder::new(5.0, 5).build().unwrap()
    }

    #[test]
    fn test_run_requires_initialize() {
        let fiber = small_fiber();
        let mut engine = CableEngine::for_fiber(&fiber).unwrap();
        let err = engine.run(1.0, DEFAULT_DT_MS);
        assert!(matches!(err, Err(MyelinError::Solver(_))));
    }

    #[test]
    fn test_resting_fiber_stays_subthreshold() {
        let fiber = small_fiber();
        let mut engine = CableEngine::for_fiber(&fiber).unwrap();
        let probe = engine.attach_probe(fiber.recording_site()).unwrap();
        engine.initialize(fiber.rest_potential());
        engine.run(5.0, DEFAULT_DT_MS).unwrap();

        let trace = engine.trace(probe).unwrap();
        assert_eq!(trace.values_mv.len(), 201);
        assert_eq!(trace.values_mv[0], -80.0);
        // Unstimulated membrane settles near rest; nothing approaches
        // the 0 mV firing level.
        assert!(trace.peak_mv() < -50.0);
    }

    #[test]
    fn test_strong_pulse_evokes_spike_downstream() {
        let fiber = small_fiber();
        let mut engine = CableEngine::for_fiber(&fiber).unwrap();
        let probe = engine.attach_probe(fiber.recording_site()).unwrap();
        let pulse = Waveform::rectangular_pulse(0.2, 0.2, 100.0, 5.0, DEFAULT_DT_MS).unwrap();
        let stim = engine
            .attach_stimulus(fiber.stimulation_site(), &pulse)
            .unwrap();
        engine.initialize(fiber.rest_potential());
        engine.run(10.0, DEFAULT_DT_MS).unwrap();
        engine.release_stimulus(stim);

        let trace = engine.trace(probe).unwrap();
        assert!(
            trace.peak_mv() > 0.0,
            "100 nA pulse should evoke a propagated spike, peak was {}",
            trace.peak_mv()
        );
    }

    #[test]
    fn test_released_stimulus_stops_driving() {
        let fiber = small_fiber();
        let mut engine = CableEngine::for_fiber(&fiber).unwrap();
        let probe = engine.attach_probe(fiber.recording_site()).unwrap();
        let pulse = Waveform::rectangular_pulse(0.2, 0.2, 100.0, 5.0, DEFAULT_DT_MS).unwrap();
        let stim = engine
            .attach_stimulus(fiber.stimulation_site(), &pulse)
            .unwrap();
        engine.release_stimulus(stim);

        engine.initialize(fiber.rest_potential());
        engine.run(5.0, DEFAULT_DT_MS).unwrap();
        let trace = engine.trace(probe).unwrap();
        assert!(trace.peak_mv() < -50.0, "released stimulus must be inert");
    }

    #[test]
    fn test_back_to_back_trials_share_baseline() {
        let fiber = small_fiber();
        let mut engine = CableEngine::for_fiber(&fiber).unwrap();
        let probe = engine.attach_probe(fiber.recording_site()).unwrap();
        let pulse = Waveform::rectangular_pulse(0.2, 0.2, 100.0, 5.0, DEFAULT_DT_MS).unwrap();

        // First trial fires a spike and leaves the membrane perturbed.
        let stim = engine
            .attach_stimulus(fiber.stimulation_site(), &pulse)
            .unwrap();
        engine.initialize(fiber.rest_potential());
        engine.run(10.0, DEFAULT_DT_MS).unwrap();
        engine.release_stimulus(stim);
        let first: Vec<f64> = engine.trace(probe).unwrap().values_mv[..8].to_vec();

        // Second trial re-initializes; its pre-stimulus baseline must
        // match the first trial exactly.
        engine.initialize(fiber.rest_potential());
        engine.run(10.0, DEFAULT_DT_MS).unwrap();
        let second: Vec<f64> = engine.trace(probe).unwrap().values_mv[..8].to_vec();

        assert_eq!(first, second);
    }

    #[test]
    fn test_rejects_unknown_compartment() {
        let fiber = small_fiber();
        let mut engine = CableEngine::for_fiber(&fiber).unwrap();
        let pulse = Waveform::rectangular_pulse(0.2, 0.2, 1.0, 5.0, DEFAULT_DT_MS).unwrap();
        assert!(engine.attach_stimulus(999, &pulse).is_err());
        assert!(engine.attach_probe(999).is_err());
    }

    #[test]
    fn test_load_replaces_previous_state() {
        let fiber = small_fiber();
        let mut engine = CableEngine::for_fiber(&fiber).unwrap();
        let _probe = engine.attach_probe(0).unwrap();
        engine.initialize(-80.0);

        let other = FiberBuilder::new(2.0, 3).build().unwrap();
        engine.load(&other).unwrap();
        assert_eq!(engine.compartment_count(), 9);
        // Probes did not survive the reload, and the clock reset.
        assert!(engine.trace(ProbeHandle(0)).is_err());
        assert!(matches!(
            engine.run(1.0, DEFAULT_DT_MS),
            Err(MyelinError::Solver(_))
        ));
    }
}
