//! Fiber Builder - Repeating Group Construction
//!
//! Builds the repeating node / paranode / juxtaparanode / internode
//! topology from the geometry rules. Between every consecutive pair of
//! nodes sits exactly one paranode, one juxtaparanode, and one internode,
//! wired distal-to-proximal:
//!
//! ```text
//! node_i → paranode_i → juxta_i → intern_i → node_{i+1}
//! ```
//!
//! Topology errors (too few nodes, non-positive diameter) fail before any
//! compartment is created.

use log::debug;

use crate::error::{MyelinError, Result};
use crate::geometry;

use super::compartment::{Compartment, ExcitableParams, Mechanism, PassiveParams, Role};
use super::fiber::Fiber;

/// Default axial resistivity (Ω·cm)
const DEFAULT_RA: f64 = 70.0;
/// Nodal membrane capacitance (µF/cm²)
const CM_NODE: f64 = 1.0;
/// Myelinated membrane capacitance (µF/cm²), reduced to approximate the
/// capacitance-shunting effect of the myelin sheath
const CM_MYELIN: f64 = 0.02;

/// Builder for a myelinated fiber of a given diameter and node count
#[derive(Clone, Debug)]
pub struct FiberBuilder {
    diameter_um: f64,
    node_count: usize,
    ra_ohm_cm: f64,
    cm_node: f64,
    cm_myelin: f64,
    nodal: ExcitableParams,
    myelinated: PassiveParams,
}

impl FiberBuilder {
    /// New builder with default electrical parameters
    pub fn new(diameter_um: f64, node_count: usize) -> Self {
        Self {
            diameter_um,
            node_count,
            ra_ohm_cm: DEFAULT_RA,
            cm_node: CM_NODE,
            cm_myelin: CM_MYELIN,
            nodal: ExcitableParams::default(),
            myelinated: PassiveParams::default(),
        }
    }

    /// Override the axial resistivity (Ω·cm)
    pub fn axial_resistivity(mut self, ra_ohm_cm: f64) -> Self {
        self.ra_ohm_cm = ra_ohm_cm;
        self
    }

    /// Override the nodal channel densities
    pub fn nodal_params(mut self, params: ExcitableParams) -> Self {
        self.nodal = params;
        self
    }

    /// Override the myelinated passive membrane
    pub fn myelinated_params(mut self, params: PassiveParams) -> Self {
        self.myelinated = params;
        self
    }

    /// Build the fiber topology
    ///
    /// Fails with `InvalidTopology` before creating anything if the
    /// diameter is non-positive or fewer than 2 nodes are requested
    /// (fewer than 2 nodes would leave no internodal segments at all).
    pub fn build(self) -> Result<Fiber> {
        if self.diameter_um <= 0.0 {
            return Err(MyelinError::InvalidTopology(format!(
                "fiber diameter must be positive, got {}",
                self.diameter_um
            )));
        }
        if self.node_count < 2 {
            return Err(MyelinError::InvalidTopology(format!(
                "fiber needs at least 2 nodes, got {}",
                self.node_count
            )));
        }

        let d = self.diameter_um;
        let groups = self.node_count - 1;
        let mut compartments = Vec::with_capacity(self.node_count + 3 * groups);
        let mut connections = Vec::with_capacity(4 * groups);
        let mut nodes = Vec::with_capacity(self.node_count);

        for i in 0..self.node_count {
            nodes.push(compartments.len());
            compartments.push(Compartment {
                name: format!("node_{i}"),
                role: Role::Node,
                length_um: geometry::node_length(),
                diam_um: d,
                ra_ohm_cm: self.ra_ohm_cm,
                cm_uf_cm2: self.cm_node,
                nseg: 1,
                mechanism: Mechanism::Excitable(self.nodal),
            });

            if i < self.node_count - 1 {
                compartments.push(self.myelinated_compartment(
                    format!("paranode_{i}"),
                    Role::Paranode,
                    geometry::paranode_length(d),
                ));
                compartments.push(self.myelinated_compartment(
                    format!("juxta_{i}"),
                    Role::Juxtaparanode,
                    geometry::juxta_length(d),
                ));
                compartments.push(self.myelinated_compartment(
                    format!("intern_{i}"),
                    Role::Internode,
                    geometry::internode_length(d),
                ));
            }
        }

        // Wire the chain: every compartment's distal end meets the next
        // compartment's proximal end, in construction order.
        for i in 0..compartments.len() - 1 {
            connections.push((i, i + 1));
        }

        debug!(
            "built fiber: diameter {} µm, {} nodes, {} compartments",
            d,
            self.node_count,
            compartments.len()
        );

        Ok(Fiber::new(compartments, connections, nodes))
    }

    fn myelinated_compartment(&self, name: String, role: Role, length_um: f64) -> Compartment {
        Compartment {
            name,
            role,
            length_um,
            diam_um: self.diameter_um,
            ra_ohm_cm: self.ra_ohm_cm,
            cm_uf_cm2: self.cm_myelin,
            nseg: 1,
            mechanism: Mechanism::Passive(self.myelinated),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compartment_counts() {
        for &(d, n) in &[(0.5, 2), (2.0, 5), (5.0, 31), (8.0, 11)] {
            let fiber = FiberBuilder::new(d, n).build().unwrap();
            assert_eq!(fiber.node_count(), n);
            assert_eq!(fiber.count_role(Role::Node), n);
            assert_eq!(fiber.count_role(Role::Paranode), n - 1);
            assert_eq!(fiber.count_role(Role::Juxtaparanode), n - 1);
            assert_eq!(fiber.count_role(Role::Internode), n - 1);
            assert!(fiber.compartments.iter().all(|c| c.length_um > 0.0));
        }
    }

    #[test]
    fn test_chain_is_unbranched() {
        let fiber = FiberBuilder::new(5.0, 4).build().unwrap();
        // 4 + 3×3 compartments, one connection per adjacent pair
        assert_eq!(fiber.compartments.len(), 13);
        assert_eq!(fiber.connections.len(), 12);
        for (i, &(src, dst)) in fiber.connections.iter().enumerate() {
            assert_eq!((src, dst), (i, i + 1));
        }
    }

    #[test]
    fn test_group_order() {
        let fiber = FiberBuilder::new(5.0, 3).build().unwrap();
        let roles: Vec<Role> = fiber.compartments.iter().map(|c| c.role).collect();
        assert_eq!(
            roles,
            vec![
                Role::Node,
                Role::Paranode,
                Role::Juxtaparanode,
                Role::Internode,
                Role::Node,
                Role::Paranode,
                Role::Juxtaparanode,
                Role::Internode,
                Role::Node,
            ]
        );
    }

    #[test]
    fn test_mechanism_assignment() {
        let fiber = FiberBuilder::new(5.0, 3).build().unwrap();
        for c in &fiber.compartments {
            match c.role {
                Role::Node => {
                    assert!(c.mechanism.is_excitable());
                    assert_eq!(c.cm_uf_cm2, 1.0);
                }
                _ => {
                    assert!(!c.mechanism.is_excitable());
                    assert_eq!(c.cm_uf_cm2, 0.02);
                }
            }
        }
    }

    #[test]
    fn test_rejects_degenerate_topology() {
        assert!(matches!(
            FiberBuilder::new(5.0, 1).build(),
            Err(MyelinError::InvalidTopology(_))
        ));
        assert!(matches!(
            FiberBuilder::new(0.0, 5).build(),
            Err(MyelinError::InvalidTopology(_))
        ));
        assert!(matches!(
            FiberBuilder::new(-2.0, 5).build(),
            Err(MyelinError::InvalidTopology(_))
        ));
    }

    #[test]
    fn test_build_is_idempotent() {
        let a = FiberBuilder::new(5.0, 21).build().unwrap();
        let b = FiberBuilder::new(5.0, 21).build().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_two_node_edge_case() {
        let fiber = FiberBuilder::new(5.0, 2).build().unwrap();
        assert_eq!(fiber.compartments.len(), 5);
        assert_eq!(fiber.stimulation_node(), 1);
        assert_eq!(fiber.recording_node(), 1);
    }
}
