//! Nodal Membrane Kinetics
//!
//! Voltage-gated channel state for excitable compartments:
//!
//! ```text
//! I_Na = g_Na * m³h * (V - E_Na)
//! I_K  = g_K  * n⁴  * (V - E_K)
//! I_L  = g_L  * (V - E_L)
//! ```
//!
//! Gating variables advance explicitly one step at a time; the voltage
//! solve consumes each mechanism as a conductance/reversal pair
//! `(Σg, Σg·E)` so the membrane current stays linear in V within a step.

use crate::cable::{ExcitableParams, PassiveParams};

/// Sodium reversal potential (mV)
const E_NA: f64 = 50.0;
/// Potassium reversal potential (mV)
const E_K: f64 = -77.0;

/// Gating variable with α and β rates
#[derive(Clone, Copy, Debug, Default)]
struct Gate {
    /// Current state (0 to 1)
    state: f64,
    /// Alpha rate (1/ms)
    alpha: f64,
    /// Beta rate (1/ms)
    beta: f64,
}

impl Gate {
    /// Snap state to its steady-state value for the current rates
    fn init_steady_state(&mut self) {
        if self.alpha + self.beta > 0.0 {
            self.state = self.alpha / (self.alpha + self.beta);
        }
    }

    /// Advance gate state one timestep
    fn update(&mut self, dt: f64) {
        let d_state = (self.alpha * (1.0 - self.state) - self.beta * self.state) * dt;
        self.state = (self.state + d_state).clamp(0.0, 1.0);
    }
}

/// Channel state of one excitable compartment
#[derive(Clone, Debug)]
pub(crate) struct NodeChannels {
    params: ExcitableParams,
    /// Sodium activation
    m: Gate,
    /// Sodium inactivation
    h: Gate,
    /// Potassium activation
    n: Gate,
}

impl NodeChannels {
    pub(crate) fn new(params: ExcitableParams) -> Self {
        Self {
            params,
            m: Gate::default(),
            h: Gate::default(),
            n: Gate::default(),
        }
    }

    /// Reset all gates to steady state at voltage `v`
    pub(crate) fn initialize(&mut self, v: f64) {
        self.update_gate_rates(v);
        self.m.init_steady_state();
        self.h.init_steady_state();
        self.n.init_steady_state();
    }

    /// Advance gate states one timestep at voltage `v`
    pub(crate) fn advance(&mut self, v: f64, dt: f64) {
        self.update_gate_rates(v);
        self.m.update(dt);
        self.h.update(dt);
        self.n.update(dt);
    }

    /// Membrane conductance and conductance-weighted reversal
    ///
    /// Returns `(Σg, Σg·E)` in (µS, µS·mV) for a compartment of the given
    /// membrane area.
    pub(crate) fn conductance_us(&self, area_cm2: f64) -> (f64, f64) {
        let scale = area_cm2 * 1.0e6;
        let g_na = self.params.g_na_bar * self.m.state.powi(3) * self.h.state * scale;
        let g_k = self.params.g_k_bar * self.n.state.powi(4) * scale;
        let g_l = self.params.g_leak * scale;
        (
            g_na + g_k + g_l,
            g_na * E_NA + g_k * E_K + g_l * self.params.e_leak,
        )
    }

    /// Update α and β rates for all gates based on voltage
    fn update_gate_rates(&mut self, v: f64) {
        // Sodium activation (m)
        self.m.alpha = if (v + 40.0).abs() < 0.001 {
            1.0
        } else {
            0.1 * (v + 40.0) / (1.0 - (-0.1 * (v + 40.0)).exp())
        };
        self.m.beta = 4.0 * (-(v + 65.0) / 18.0).exp();

        // Sodium inactivation (h)
        self.h.alpha = 0.07 * (-0.05 * (v + 65.0)).exp();
        self.h.beta = 1.0 / (1.0 + (-0.1 * (v + 35.0)).exp());

        // Potassium activation (n)
        self.n.alpha = if (v + 55.0).abs() < 0.001 {
            0.1
        } else {
            0.01 * (v + 55.0) / (1.0 - (-0.1 * (v + 55.0)).exp())
        };
        self.n.beta = 0.125 * (-0.0125 * (v + 65.0)).exp();
    }
}

/// Passive membrane as a conductance/reversal pair
pub(crate) fn passive_conductance_us(params: &PassiveParams, area_cm2: f64) -> (f64, f64) {
    let g = params.g_pas * area_cm2 * 1.0e6;
    (g, g * params.e_pas)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gates_initialized_in_range() {
        let mut ch = NodeChannels::new(ExcitableParams::default());
        ch.initialize(-80.0);
        assert!(ch.m.state > 0.0 && ch.m.state < 1.0);
        assert!(ch.h.state > 0.0 && ch.h.state < 1.0);
        assert!(ch.n.state > 0.0 && ch.n.state < 1.0);
        // Hyperpolarized rest: little activation, high inactivation reserve
        assert!(ch.m.state < 0.1);
        assert!(ch.h.state > 0.5);
    }

    #[test]
    fn test_gates_steady_under_constant_voltage() {
        let mut ch = NodeChannels::new(ExcitableParams::default());
        ch.initialize(-80.0);
        let m0 = ch.m.state;
        for _ in 0..100 {
            ch.advance(-80.0, 0.025);
        }
        assert!((ch.m.state - m0).abs() < 1e-6, "steady state must hold");
    }

    #[test]
    fn test_depolarization_opens_sodium() {
        let mut ch = NodeChannels::new(ExcitableParams::default());
        ch.initialize(-80.0);
        let (g_rest, _) = ch.conductance_us(1.0e-7);
        for _ in 0..40 {
            ch.advance(-20.0, 0.025);
        }
        let (g_depol, _) = ch.conductance_us(1.0e-7);
        assert!(g_depol > g_rest, "depolarization must raise conductance");
    }

    #[test]
    fn test_passive_pair() {
        let p = PassiveParams::default();
        let (g, ge) = passive_conductance_us(&p, 1.0e-4);
        assert!((g - 1.0e-3).abs() < 1e-12);
        assert!((ge / g - p.e_pas).abs() < 1e-9);
    }
}
