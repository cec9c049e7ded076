//! Error types for myelin

use thiserror::Error;

/// Myelin error type
#[derive(Debug, Error)]
pub enum MyelinError {
    /// Fiber topology rejected before construction
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    /// Stimulus waveform rejected before attachment
    #[error("invalid waveform: {0}")]
    InvalidWaveform(String),

    /// Failure surfaced by the simulation engine
    #[error("solver error: {0}")]
    Solver(String),
}

pub type Result<T> = std::result::Result<T, MyelinError>;
