//! Error types for the simulator crate.

use thiserror::Error;

/// Errors raised while configuring or running a simulation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SimError {
    /// Probability mass of the state departed from 1. The diagram is no
    /// longer trustworthy and the run must stop.
    #[error("probability mass of the state is {total}, expected 1 within {tolerance}")]
    ProbabilityMismatch {
        /// Measured total mass.
        total: f64,
        /// Allowed deviation.
        tolerance: f64,
    },

    /// A qubit index beyond the allocated qubits.
    #[error("qubit {qubit} out of range for {num_qubits} qubits")]
    QubitOutOfRange { qubit: usize, num_qubits: usize },

    /// A controlled gate whose control is also its target.
    #[error("qubit {0} is both control and target")]
    ControlIsTarget(usize),

    /// Shots must be at least 1.
    #[error("shots must be at least 1, got {0}")]
    InvalidShots(u32),

    /// The configuration file could not be read.
    #[error("failed to read config file '{path}': {source}")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML for [`SimConfig`](crate::SimConfig).
    #[error("failed to parse config: {0}")]
    ConfigParse(String),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Front-end error.
    #[error(transparent)]
    Qasm(#[from] quiver_qasm::QasmError),

    /// Decision-diagram construction error.
    #[error("decision diagram error: {0}")]
    Dd(#[from] quiver_dd::DdError),
}

/// Result type for simulator operations.
pub type SimResult<T> = Result<T, SimError>;
