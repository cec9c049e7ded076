//! # Myelin - Fiber Threshold Simulation
//!
//! Models electrical signal propagation along a myelinated nerve fiber as
//! a chain of discrete cable compartments and finds the minimum stimulus
//! amplitude that triggers a propagating action potential.
//!
//! ## Core Components
//!
//! - **Geometry rules**: diameter-keyed lengths for the repeating
//!   node / paranode / juxtaparanode / internode group
//! - **FiberBuilder**: procedural generation of the compartment chain
//!   (N nodes, N−1 myelinated groups, one unbranched chain)
//! - **CableEngine**: reference implicit solver behind the [`Simulator`]
//!   trait - backward-Euler voltage solve, explicit channel gating
//! - **ThresholdSearch**: bisection over a stimulus scale factor with a
//!   pluggable firing detector
//! - **Sweep**: diameter → threshold map over a batch of fibers
//!
//! ## Design Principles
//!
//! - **Arena topology**: a fiber is a vec of compartments plus
//!   (source, destination) index pairs - serializable, comparable, no
//!   pointer graph
//! - **One mechanism per compartment**: excitable (nodal Na/K/leak) or
//!   passive (myelinated), a tagged variant rather than a hierarchy
//! - **Fail fast**: topology and waveform validation happens before any
//!   solver state exists
//! - **Trial isolation**: every trial re-initializes the engine to a
//!   uniform resting potential; stimulus handles die with their trial
//!
//! ## Example
//!
//! ```ignore
//! use myelin::{CableEngine, FiberBuilder, SearchConfig, Simulator,
//!              ThresholdSearch, Waveform};
//!
//! let fiber = FiberBuilder::new(5.0, 31).build()?;
//! let mut engine = CableEngine::for_fiber(&fiber)?;
//! let pulse = Waveform::rectangular_pulse(0.2, 0.2, 1.0, 5.0, 0.025)?;
//!
//! let search = ThresholdSearch::new(SearchConfig {
//!     scale_hi: 2000.0,
//!     tolerance: 0.1,
//!     ..SearchConfig::default()
//! });
//! let outcome = search.run(&mut engine, &fiber, &pulse)?;
//! println!("threshold scale: {:?}", outcome.scale());
//! ```

// Diameter-keyed compartment sizing
pub mod geometry;

// Compartments, fibers, and the repeating-group builder
pub mod cable;
pub use cable::{
    Compartment, CompartmentId, ExcitableParams, Fiber, FiberBuilder, Mechanism, PassiveParams,
    Role,
};

// Stimulus waveforms
mod stimulus;
pub use stimulus::Waveform;

// Solver boundary and the reference cable engine
pub mod engine;
pub use engine::{CableEngine, ProbeHandle, Simulator, StimulusHandle, Trace, DEFAULT_DT_MS};

// Bisection threshold search
mod search;
pub use search::{PeakDetector, SearchConfig, SpikeDetector, ThresholdOutcome, ThresholdSearch};

// Diameter sweep
mod sweep;
pub use sweep::{run_sweep, PulseConfig, SweepConfig, SweepEntry};

// Error types
mod error;
pub use error::{MyelinError, Result};
