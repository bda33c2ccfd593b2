//! Decision-diagram simulation of `OpenQASM` 2 programs
//!
//! The state of the circuit is a single [`quiver_dd`] diagram owned by the
//! [`Simulator`]. The [`QasmSimulator`] compiles a program into it through the
//! [`quiver_qasm::Executor`] seam and samples measurement outcomes.
//!
//! # Example
//!
//! ```rust
//! use quiver_sim::{H_MATRIX, Simulator, X_MATRIX};
//!
//! let mut sim = Simulator::seeded(42);
//! sim.add_variables(2, "q");
//! sim.apply_matrix(&H_MATRIX, &[], 0).unwrap();
//! sim.apply_matrix(&X_MATRIX, &[0], 1).unwrap();
//!
//! let bits = sim.measure_all(false).unwrap();
//! assert!(bits == "00" || bits == "11");
//! ```

mod config;
mod engine;
mod error;
mod executor;
mod qasm_simulator;
mod report;

pub use config::SimConfig;
pub use engine::{H_MATRIX, Simulator, X_MATRIX, u_matrix};
pub use error::{SimError, SimResult};
pub use qasm_simulator::QasmSimulator;
pub use report::{ProbabilityDump, SimulationReport, SimulationStats, Snapshot};
