//! Compartments and Membrane Mechanisms
//!
//! A compartment is a single electrically lumped cable segment. Each one
//! carries exactly one membrane mechanism:
//!
//! - **Excitable**: concentrated voltage-gated Na/K channel densities plus
//!   leak (nodes of Ranvier).
//! - **Passive**: a single fixed conductance and reversal potential
//!   (myelin-covered paranode / juxtaparanode / internode).
//!
//! The mechanism is a tagged variant, not a trait object - only two kinds
//! exist and each maps to a fixed numeric parameter set.

use serde::{Deserialize, Serialize};

/// Position of a compartment within the repeating myelinated group
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Short excitable gap in the myelin
    Node,
    /// Myelin attachment region flanking the node
    Paranode,
    /// Transition region under the myelin edge
    Juxtaparanode,
    /// Long fully myelinated span
    Internode,
}

/// Excitable membrane parameters (nodal channel densities)
///
/// Defaults are deliberately above classical squid-axon densities,
/// reflecting the concentrated channel population at nodes of Ranvier.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExcitableParams {
    /// Peak sodium conductance (S/cm²)
    pub g_na_bar: f64,
    /// Peak potassium conductance (S/cm²)
    pub g_k_bar: f64,
    /// Leak conductance (S/cm²)
    pub g_leak: f64,
    /// Leak reversal potential (mV)
    pub e_leak: f64,
}

impl Default for ExcitableParams {
    fn default() -> Self {
        Self {
            g_na_bar: 0.18,
            g_k_bar: 0.036,
            g_leak: 3.0e-4,
            e_leak: -80.0,
        }
    }
}

/// Passive membrane parameters (myelinated segments)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PassiveParams {
    /// Passive conductance (S/cm²)
    pub g_pas: f64,
    /// Passive reversal potential (mV)
    pub e_pas: f64,
}

impl Default for PassiveParams {
    fn default() -> Self {
        Self {
            g_pas: 1.0e-5,
            e_pas: -80.0,
        }
    }
}

/// Membrane mechanism attached to a compartment
///
/// Every compartment has exactly one of these - never both, never neither.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Mechanism {
    /// Voltage-gated Na/K channels plus leak
    Excitable(ExcitableParams),
    /// Single fixed conductance
    Passive(PassiveParams),
}

impl Mechanism {
    /// Reversal potential of the leak/passive pathway (mV)
    pub fn rest_potential(&self) -> f64 {
        match self {
            Self::Excitable(p) => p.e_leak,
            Self::Passive(p) => p.e_pas,
        }
    }

    /// True for the excitable variant
    pub fn is_excitable(&self) -> bool {
        matches!(self, Self::Excitable(_))
    }
}

/// A uniquely named electrical cable segment
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Compartment {
    /// Unique name, e.g. `node_3`
    pub name: String,
    /// Role within the repeating group
    pub role: Role,
    /// Length (µm)
    pub length_um: f64,
    /// Diameter (µm)
    pub diam_um: f64,
    /// Axial resistivity (Ω·cm)
    pub ra_ohm_cm: f64,
    /// Per-area membrane capacitance (µF/cm²)
    pub cm_uf_cm2: f64,
    /// Discretization count (fixed at 1 for this model)
    pub nseg: u32,
    /// Membrane mechanism
    pub mechanism: Mechanism,
}

impl Compartment {
    /// Lateral membrane area (cm²)
    pub fn area_cm2(&self) -> f64 {
        std::f64::consts::PI * self.diam_um * self.length_um * 1.0e-8
    }

    /// Total membrane capacitance (nF)
    pub fn capacitance_nf(&self) -> f64 {
        self.cm_uf_cm2 * self.area_cm2() * 1.0e3
    }

    /// Axial resistance from one end to the midpoint (MΩ)
    pub fn half_axial_mohm(&self) -> f64 {
        let half_length_cm = self.length_um * 1.0e-4 / 2.0;
        let radius_cm = self.diam_um * 0.5e-4;
        let cross_cm2 = std::f64::consts::PI * radius_cm * radius_cm;
        self.ra_ohm_cm * half_length_cm / cross_cm2 * 1.0e-6
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn test_node() -> Compartment {
        Compartment {
            name: "node_0".to_string(),
            role: Role::Node,
            length_um: 1.0,
            diam_um: 5.0,
            ra_ohm_cm: 70.0,
            cm_uf_cm2: 1.0,
            nseg: 1,
            mechanism: Mechanism::Excitable(ExcitableParams::default()),
        }
    }

    #[test]
    fn test_area() {
        // π × 5 µm × 1 µm = 15.7 µm² = 1.57e-7 cm²
        assert_relative_eq!(test_node().area_cm2(), 1.5708e-7, max_relative = 1e-3);
    }

    #[test]
    fn test_half_axial_resistance() {
        // 500 µm internode at 5 µm diameter: Ra·(L/2)/A_cross ≈ 8.9 MΩ per half
        let intern = Compartment {
            name: "intern_0".to_string(),
            role: Role::Internode,
            length_um: 500.0,
            diam_um: 5.0,
            ra_ohm_cm: 70.0,
            cm_uf_cm2: 0.02,
            nseg: 1,
            mechanism: Mechanism::Passive(PassiveParams::default()),
        };
        assert_relative_eq!(intern.half_axial_mohm(), 8.913, max_relative = 1e-3);
    }

    #[test]
    fn test_mechanism_rest_potential() {
        let m = Mechanism::Excitable(ExcitableParams::default());
        assert_eq!(m.rest_potential(), -80.0);
        assert!(m.is_excitable());

        let p = Mechanism::Passive(PassiveParams::default());
        assert_eq!(p.rest_potential(), -80.0);
        assert!(!p.is_excitable());
    }

    #[test]
    fn test_compartment_serialization() {
        let c = test_node();
        let json = serde_json::to_string(&c).unwrap();
        let restored: Compartment = serde_json::from_str(&json).unwrap();
        assert_eq!(c, restored);
    }
}
