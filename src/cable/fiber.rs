//! Fiber - Arena of Compartments with Linear Connectivity
//!
//! A fiber is an ordered arena of compartments plus an adjacency list of
//! `(source, destination)` index pairs, each meaning "the distal end of
//! `source` connects to the proximal end of `destination`". The chain is
//! unbranched, so the adjacency list is a degenerate tree with no branch
//! points. Keeping connectivity as index pairs (rather than a pointer
//! graph) makes the whole fiber serializable and comparison-testable.

use serde::{Deserialize, Serialize};

use super::compartment::{Compartment, Role};

/// Index of a compartment within a fiber's arena
pub type CompartmentId = usize;

/// A complete myelinated fiber topology
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fiber {
    /// All compartments in construction order
    pub compartments: Vec<Compartment>,
    /// Distal-to-proximal connections as (source, destination) pairs
    pub connections: Vec<(CompartmentId, CompartmentId)>,
    /// Arena indices of the nodes, in proximal-to-distal order
    nodes: Vec<CompartmentId>,
    /// Node-list index of the default stimulation site (⌊N/2⌋)
    stimulation_node: usize,
    /// Node-list index of the default recording site (N−1)
    recording_node: usize,
}

impl Fiber {
    /// Assemble a fiber from its parts. Internal to the builder.
    pub(crate) fn new(
        compartments: Vec<Compartment>,
        connections: Vec<(CompartmentId, CompartmentId)>,
        nodes: Vec<CompartmentId>,
    ) -> Self {
        let stimulation_node = nodes.len() / 2;
        let recording_node = nodes.len() - 1;
        Self {
            compartments,
            connections,
            nodes,
            stimulation_node,
            recording_node,
        }
    }

    /// Number of nodes of Ranvier
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Arena indices of the nodes, proximal to distal
    pub fn nodes(&self) -> &[CompartmentId] {
        &self.nodes
    }

    /// Arena index of the node at the given node-list position
    pub fn node(&self, index: usize) -> Option<CompartmentId> {
        self.nodes.get(index).copied()
    }

    /// Node-list index of the default stimulation site (mid-fiber node)
    pub fn stimulation_node(&self) -> usize {
        self.stimulation_node
    }

    /// Node-list index of the default recording site (distal node)
    pub fn recording_node(&self) -> usize {
        self.recording_node
    }

    /// Arena index of the default stimulation compartment
    pub fn stimulation_site(&self) -> CompartmentId {
        self.nodes[self.stimulation_node]
    }

    /// Arena index of the default recording compartment
    pub fn recording_site(&self) -> CompartmentId {
        self.nodes[self.recording_node]
    }

    /// Compartment by arena index
    pub fn compartment(&self, id: CompartmentId) -> Option<&Compartment> {
        self.compartments.get(id)
    }

    /// Count compartments with the given role
    pub fn count_role(&self, role: Role) -> usize {
        self.compartments.iter().filter(|c| c.role == role).count()
    }

    /// Uniform resting potential of the fiber (mV)
    ///
    /// All mechanisms share one leak/passive reversal; this is the value
    /// trials initialize the membrane to.
    pub fn rest_potential(&self) -> f64 {
        self.compartments[self.nodes[0]].mechanism.rest_potential()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cable::FiberBuilder;

    #[test]
    fn test_default_sites() {
        let fiber = FiberBuilder::new(5.0, 31).build().unwrap();
        assert_eq!(fiber.stimulation_node(), 15);
        assert_eq!(fiber.recording_node(), 30);
        assert_eq!(
            fiber.compartment(fiber.stimulation_site()).unwrap().role,
            Role::Node
        );
    }

    #[test]
    fn test_rest_potential() {
        let fiber = FiberBuilder::new(5.0, 3).build().unwrap();
        assert_eq!(fiber.rest_potential(), -80.0);
    }

    #[test]
    fn test_fiber_serialization() {
        let fiber = FiberBuilder::new(2.0, 5).build().unwrap();
        let json = serde_json::to_string(&fiber).unwrap();
        let restored: Fiber = serde_json::from_str(&json).unwrap();
        assert_eq!(fiber, restored);
    }
}
