//! # Cable Topology - Compartments, Fibers, and the Builder
//!
//! The discretized cable model of a myelinated fiber:
//!
//! - **Compartment**: one lumped electrical segment with exactly one
//!   membrane mechanism (excitable or passive)
//! - **Fiber**: an arena of compartments plus a `(source, destination)`
//!   adjacency list forming a single unbranched chain
//! - **FiberBuilder**: generates the repeating
//!   node / paranode / juxtaparanode / internode groups from the
//!   diameter-keyed geometry rules
//!
//! With N nodes a fiber carries exactly N−1 of each myelinated role. The
//! mid-fiber node is the default stimulation site and the distal node the
//! default recording site.

// Compartment records and mechanism parameter sets
mod compartment;
pub use compartment::{Compartment, ExcitableParams, Mechanism, PassiveParams, Role};

// Fiber arena and connectivity
mod fiber;
pub use fiber::{CompartmentId, Fiber};

// Repeating-group construction
mod builder;
pub use builder::FiberBuilder;
