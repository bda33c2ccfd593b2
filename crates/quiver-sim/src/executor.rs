//! Drives the engine from the QASM compiler.

use quiver_qasm::Executor;
use tracing::info;

use crate::engine::{Simulator, X_MATRIX, u_matrix};
use crate::error::SimError;

impl Executor for Simulator {
    type Error = SimError;

    fn num_qubits(&self) -> usize {
        Simulator::num_qubits(self)
    }

    fn add_qubits(&mut self, count: usize, register: &str) -> Result<(), SimError> {
        self.add_variables(count, register);
        Ok(())
    }

    fn apply_u(&mut self, theta: f64, phi: f64, lambda: f64, qubit: usize) -> Result<(), SimError> {
        self.apply_matrix(&u_matrix(theta, phi, lambda), &[], qubit)
    }

    fn apply_cx(&mut self, control: usize, target: usize) -> Result<(), SimError> {
        self.apply_matrix(&X_MATRIX, &[control], target)
    }

    fn measure(&mut self, qubit: usize) -> Result<u8, SimError> {
        self.measure_one(qubit)
    }

    fn reset(&mut self, qubit: usize) -> Result<(), SimError> {
        self.reset_qubit(qubit)
    }

    fn show_probabilities(&mut self) -> Result<(), SimError> {
        if self.recording() {
            let dump = self.dump_probabilities()?;
            info!(states = dump.probabilities.len(), "probabilities:\n{dump}");
        }
        Ok(())
    }

    fn snapshot(&mut self, label: &str) -> Result<(), SimError> {
        self.record_snapshot(label)
    }
}
