//! The seam between the compiler and whatever runs the circuit.

use crate::error::QasmError;

/// Receives the compiler's register allocations, gate applications and
/// measurements.
///
/// Qubits are numbered globally in declaration order: the first qubit of
/// the first `qreg` is qubit 0.
pub trait Executor {
    /// Error type of the backend. Front-end errors convert into it.
    type Error: From<QasmError>;

    /// Number of qubits allocated so far.
    fn num_qubits(&self) -> usize;

    /// Allocate `count` fresh qubits in |0⟩ for register `register`.
    fn add_qubits(&mut self, count: usize, register: &str) -> Result<(), Self::Error>;

    /// Apply `U(theta, phi, lambda)` to `qubit`.
    fn apply_u(&mut self, theta: f64, phi: f64, lambda: f64, qubit: usize) -> Result<(), Self::Error>;

    /// Apply a controlled NOT.
    fn apply_cx(&mut self, control: usize, target: usize) -> Result<(), Self::Error>;

    /// Measure one qubit, collapsing the state, and return the outcome.
    fn measure(&mut self, qubit: usize) -> Result<u8, Self::Error>;

    /// Return `qubit` to |0⟩.
    fn reset(&mut self, qubit: usize) -> Result<(), Self::Error>;

    /// Dump the basis-state probabilities of the current state.
    fn show_probabilities(&mut self) -> Result<(), Self::Error>;

    /// Record a snapshot of the current state under `label`.
    fn snapshot(&mut self, label: &str) -> Result<(), Self::Error>;
}
