//! The simulation engine: owns the state diagram and applies gates and
//! measurements to it.
//!
//! Qubit `q` of an `n`-qubit state lives on diagram variable `n - 1 - q`,
//! so the first declared qubit is the most significant one and registers
//! declared later are added below the existing variables.

use std::collections::BTreeMap;
use std::f64::consts::FRAC_1_SQRT_2;

use num_complex::Complex64;
use quiver_dd::{Edge, LineRole, Matrix2, NodeId, Package, Root};
use rand::Rng;
use rand::rngs::StdRng;
use rustc_hash::FxHashMap;
use tracing::{debug, error, trace};

use crate::config::SimConfig;
use crate::error::{SimError, SimResult};
use crate::report::{ProbabilityDump, Snapshot};

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);

/// Pauli X.
pub const X_MATRIX: Matrix2 = [[ZERO, ONE], [ONE, ZERO]];

/// Hadamard.
pub const H_MATRIX: Matrix2 = [
    [Complex64::new(FRAC_1_SQRT_2, 0.0), Complex64::new(FRAC_1_SQRT_2, 0.0)],
    [Complex64::new(FRAC_1_SQRT_2, 0.0), Complex64::new(-FRAC_1_SQRT_2, 0.0)],
];

const PROJECT_ZERO: Matrix2 = [[ONE, ZERO], [ZERO, ZERO]];
const PROJECT_ONE: Matrix2 = [[ZERO, ZERO], [ZERO, ONE]];

/// The `U(theta, phi, lambda)` rotation.
pub fn u_matrix(theta: f64, phi: f64, lambda: f64) -> Matrix2 {
    let (sin, cos) = (theta / 2.0).sin_cos();
    let sum = (phi + lambda) / 2.0;
    let diff = (phi - lambda) / 2.0;
    [
        [
            Complex64::from_polar(cos, -sum),
            -Complex64::from_polar(sin, -diff),
        ],
        [
            Complex64::from_polar(sin, diff),
            Complex64::from_polar(cos, sum),
        ],
    ]
}

/// Decision-diagram state of a circuit under simulation.
pub struct Simulator {
    package: Package,
    state: Root,
    /// Qubit labels indexed by variable.
    labels: Vec<String>,
    /// Last measured outcome per variable.
    measurements: Vec<u8>,
    rng: StdRng,
    tolerance: f64,
    complex_limit: usize,
    gate_count: u64,
    max_active: usize,
    record_statevector: bool,
    record_probabilities: bool,
    recording: bool,
    snapshots: BTreeMap<String, Snapshot>,
    probability_dumps: Vec<ProbabilityDump>,
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("qubits", &self.labels.len())
            .field("gate_count", &self.gate_count)
            .field("active_nodes", &self.package.active_nodes())
            .field("weights", &self.package.weight_count())
            .finish_non_exhaustive()
    }
}

impl Simulator {
    /// An empty (zero-qubit) state.
    pub fn new(config: &SimConfig, rng: StdRng) -> Self {
        let mut package = Package::new(config.precision);
        let state = package.retain(Edge::ONE);
        Self {
            package,
            state,
            labels: Vec::new(),
            measurements: Vec::new(),
            rng,
            tolerance: config.tolerance,
            complex_limit: config.complex_limit,
            gate_count: 0,
            max_active: 0,
            record_statevector: config.display_statevector,
            record_probabilities: config.display_probabilities,
            recording: true,
            snapshots: BTreeMap::new(),
            probability_dumps: Vec::new(),
        }
    }

    /// An engine with default settings and a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        use rand::SeedableRng;
        Self::new(&SimConfig::default(), StdRng::seed_from_u64(seed))
    }

    pub fn num_qubits(&self) -> usize {
        self.labels.len()
    }

    /// Qubit labels, most significant (first declared) first.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().rev().map(String::as_str)
    }

    /// Number of gates applied so far.
    pub fn gate_count(&self) -> u64 {
        self.gate_count
    }

    /// Peak number of referenced nodes after any gate.
    pub fn max_active_nodes(&self) -> usize {
        self.max_active
    }

    /// Currently referenced nodes.
    pub fn active_nodes(&self) -> usize {
        self.package.active_nodes()
    }

    /// Enable or disable recording of snapshots and probability dumps.
    pub fn set_recording(&mut self, recording: bool) {
        self.recording = recording;
    }

    fn variable(&self, qubit: usize) -> SimResult<usize> {
        let n = self.labels.len();
        if qubit >= n {
            return Err(SimError::QubitOutOfRange {
                qubit,
                num_qubits: n,
            });
        }
        Ok(n - 1 - qubit)
    }

    // ------------------------------------------------------------------
    // State construction
    // ------------------------------------------------------------------

    /// Append `count` qubits in |0⟩ labelled `name[0]..name[count-1]`.
    ///
    /// The new qubits take variables `0..count` and every existing node moves
    /// up by `count`. Each existing node is rebuilt once.
    pub fn add_variables(&mut self, count: usize, name: &str) {
        if count == 0 {
            return;
        }

        let mut ground = Edge::ONE;
        for var in 0..count {
            ground = self
                .package
                .make_nonterminal(var, [ground, Edge::ZERO, Edge::ZERO, Edge::ZERO]);
        }

        let mut memo = FxHashMap::default();
        let extended = self.lift(self.state.edge(), ground, count, &mut memo);
        self.package.replace(&mut self.state, extended);
        self.package.garbage_collect();

        let mut labels: Vec<String> = (0..count).rev().map(|i| format!("{name}[{i}]")).collect();
        labels.append(&mut self.labels);
        self.labels = labels;
        self.measurements = vec![0; self.labels.len()];
        debug!(register = name, count, qubits = self.labels.len(), "added qubits");
    }

    fn lift(
        &mut self,
        edge: Edge,
        ground: Edge,
        shift: usize,
        memo: &mut FxHashMap<NodeId, Edge>,
    ) -> Edge {
        if edge.is_zero() {
            return Edge::ZERO;
        }
        let weight = self.package.weight(edge.weight);
        let lifted = if edge.is_terminal() {
            ground
        } else if let Some(&hit) = memo.get(&edge.node) {
            hit
        } else {
            let (var, children) = {
                let node = self.package.node(edge.node);
                (node.var, node.children)
            };
            let mut lifted_children = [Edge::ZERO; 4];
            for (slot, child) in lifted_children.iter_mut().zip(children) {
                *slot = self.lift(child, ground, shift, memo);
            }
            let rebuilt = self.package.make_nonterminal(var + shift, lifted_children);
            memo.insert(edge.node, rebuilt);
            rebuilt
        };
        self.package.scale(lifted, weight)
    }

    /// Multiply the state by a gate diagram and tidy the package.
    pub fn apply_gate(&mut self, gate: Edge) {
        let next = self.package.multiply(gate, self.state.edge());
        self.package.replace(&mut self.state, next);
        self.gate_count += 1;
        self.collect();
    }

    /// Apply a single-target gate with positive `controls`.
    pub fn apply_matrix(&mut self, matrix: &Matrix2, controls: &[usize], target: usize) -> SimResult<()> {
        let gate = self.gate(matrix, controls, target)?;
        self.apply_gate(gate);
        Ok(())
    }

    fn gate(&mut self, matrix: &Matrix2, controls: &[usize], target: usize) -> SimResult<Edge> {
        let mut roles = vec![LineRole::Idle; self.labels.len()];
        for &control in controls {
            if control == target {
                return Err(SimError::ControlIsTarget(control));
            }
            roles[self.variable(control)?] = LineRole::Control;
        }
        roles[self.variable(target)?] = LineRole::Target;
        Ok(self.package.make_gate(matrix, &roles)?)
    }

    fn collect(&mut self) {
        self.package.garbage_collect();
        self.max_active = self.max_active.max(self.package.active_nodes());
        if self.package.weight_count() > self.complex_limit {
            self.package
                .compact_weights(std::slice::from_mut(&mut self.state));
            if self.complex_limit < 2 * self.package.weight_count() {
                self.complex_limit *= 2;
            }
            trace!(
                weights = self.package.weight_count(),
                limit = self.complex_limit,
                "compacted weight table"
            );
        }
    }

    /// Back to zero qubits in state 1. The random generator and the
    /// statistics carry over.
    pub fn reset(&mut self) {
        self.package.replace(&mut self.state, Edge::ONE);
        self.package.garbage_collect();
        self.labels.clear();
        self.measurements.clear();
    }

    // ------------------------------------------------------------------
    // Probabilities
    // ------------------------------------------------------------------

    /// Total probability mass below every node reachable from `edge`,
    /// memoized by node, plus the mass of `edge` itself.
    fn assign_probs(&self, edge: Edge, memo: &mut FxHashMap<NodeId, f64>) -> f64 {
        if edge.is_zero() {
            return 0.0;
        }
        self.package.mag2(edge.weight) * self.node_mass(edge.node, memo)
    }

    fn node_mass(&self, id: NodeId, memo: &mut FxHashMap<NodeId, f64>) -> f64 {
        if id.is_terminal() {
            return 1.0;
        }
        if let Some(&mass) = memo.get(&id) {
            return mass;
        }
        let children = self.package.node(id).children;
        let mass = self.assign_probs(children[0], memo) + self.assign_probs(children[2], memo);
        memo.insert(id, mass);
        mass
    }

    /// Sum of squared amplitude magnitudes of the current state.
    pub fn total_probability(&self) -> f64 {
        self.assign_probs(self.state.edge(), &mut FxHashMap::default())
    }

    fn check_total(&self, total: f64) -> SimResult<()> {
        if (total - 1.0).abs() > self.tolerance {
            error!(total, tolerance = self.tolerance, "probability mass is not 1");
            return Err(SimError::ProbabilityMismatch {
                total,
                tolerance: self.tolerance,
            });
        }
        Ok(())
    }

    /// Amplitudes of the state. Bit `v` of the index is variable `v`.
    pub fn statevector(&self) -> SimResult<Vec<Complex64>> {
        self.package
            .amplitudes(self.state.edge(), self.labels.len())
            .map_err(SimError::from)
    }

    /// Basis-state probabilities, indexed like [`statevector`](Self::statevector).
    pub fn probabilities(&self) -> SimResult<Vec<f64>> {
        Ok(self.statevector()?.iter().map(Complex64::norm_sqr).collect())
    }

    // ------------------------------------------------------------------
    // Measurement
    // ------------------------------------------------------------------

    /// Sample every qubit at once and return the bitstring, first declared
    /// qubit leftmost.
    ///
    /// The state is left untouched unless `reset_state` is set, in which
    /// case it becomes the measured basis state.
    pub fn measure_all(&mut self, reset_state: bool) -> SimResult<String> {
        let root = self.state.edge();
        let mut memo = FxHashMap::default();
        let total = self.assign_probs(root, &mut memo);
        self.check_total(total)?;

        let mut weight = self.package.weight(root.weight);
        let mut cur = root;
        while !cur.is_terminal() {
            let (var, children) = {
                let node = self.package.node(cur.node);
                (node.var, node.children)
            };
            let branch = |child: Edge, memo: &mut FxHashMap<NodeId, f64>| -> f64 {
                if child.is_zero() {
                    0.0
                } else {
                    (weight * self.package.weight(child.weight)).norm_sqr()
                        * self.node_mass(child.node, memo)
                }
            };
            let p0 = branch(children[0], &mut memo);
            let p1 = branch(children[2], &mut memo);
            self.check_total(p0 + p1)?;

            let draw: f64 = self.rng.r#gen();
            let (outcome, child, p) = if draw < p0 / (p0 + p1) {
                (0, children[0], p0)
            } else {
                (1, children[2], p1)
            };
            self.measurements[var] = outcome;
            weight = weight * self.package.weight(child.weight) / p.sqrt();
            cur = child;
        }

        if reset_state {
            let mut edge = Edge::ONE;
            for (var, &bit) in self.measurements.iter().enumerate() {
                let children = if bit == 0 {
                    [edge, Edge::ZERO, Edge::ZERO, Edge::ZERO]
                } else {
                    [Edge::ZERO, Edge::ZERO, edge, Edge::ZERO]
                };
                edge = self.package.make_nonterminal(var, children);
            }
            self.package.replace(&mut self.state, edge);
            self.package.garbage_collect();
        }

        Ok(self.bitstring())
    }

    /// Last measured outcomes, first declared qubit leftmost.
    pub fn bitstring(&self) -> String {
        self.measurements
            .iter()
            .rev()
            .map(|&bit| if bit == 0 { '0' } else { '1' })
            .collect()
    }

    /// Measure one qubit, collapse the state onto the outcome and
    /// renormalize. The projection does not count as a gate.
    pub fn measure_one(&mut self, qubit: usize) -> SimResult<u8> {
        let target = self.variable(qubit)?;
        let root = self.state.edge();

        // Probability of reaching each node on the way down to `target`.
        let mut level: FxHashMap<NodeId, f64> = FxHashMap::default();
        if !root.is_zero() {
            level.insert(root.node, self.package.mag2(root.weight));
        }
        for _ in (target + 1..self.labels.len()).rev() {
            let mut next: FxHashMap<NodeId, f64> = FxHashMap::default();
            for (&id, &reach) in &level {
                let children = self.package.node(id).children;
                for child in [children[0], children[2]] {
                    if !child.is_zero() {
                        *next.entry(child.node).or_insert(0.0) +=
                            reach * self.package.mag2(child.weight);
                    }
                }
            }
            level = next;
        }

        let mut memo = FxHashMap::default();
        let (mut p0, mut p1) = (0.0, 0.0);
        for (&id, &reach) in &level {
            let children = self.package.node(id).children;
            p0 += reach * self.assign_probs(children[0], &mut memo);
            p1 += reach * self.assign_probs(children[2], &mut memo);
        }
        self.check_total(p0 + p1)?;

        let draw: f64 = self.rng.r#gen();
        let (outcome, p, projector) = if draw < p0 / (p0 + p1) {
            (0u8, p0, &PROJECT_ZERO)
        } else {
            (1u8, p1, &PROJECT_ONE)
        };
        debug!(qubit = %self.labels[target], p0, p1, outcome, "measured qubit");

        let gate = self.gate(projector, &[], qubit)?;
        let projected = self.package.multiply(gate, root);
        self.package.replace(&mut self.state, projected);
        self.package.rescale(&mut self.state, Complex64::new(1.0 / p.sqrt(), 0.0));
        self.package.garbage_collect();

        self.measurements[target] = outcome;
        Ok(outcome)
    }

    /// Measure `qubit` and flip it back to |0⟩ if it came out 1.
    pub fn reset_qubit(&mut self, qubit: usize) -> SimResult<()> {
        if self.measure_one(qubit)? == 1 {
            self.apply_matrix(&X_MATRIX, &[], qubit)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Recording
    // ------------------------------------------------------------------

    /// Record the probabilities of the current state.
    pub fn dump_probabilities(&mut self) -> SimResult<&ProbabilityDump> {
        let dump = ProbabilityDump {
            labels: self.labels().map(str::to_string).collect(),
            probabilities: self.probabilities()?,
        };
        self.probability_dumps.push(dump);
        Ok(&self.probability_dumps[self.probability_dumps.len() - 1])
    }

    /// Record a snapshot under `label` if any display option is enabled.
    pub fn record_snapshot(&mut self, label: &str) -> SimResult<()> {
        if !self.recording || !(self.record_statevector || self.record_probabilities) {
            trace!(label, "snapshot not recorded");
            return Ok(());
        }
        let amplitudes = self.statevector()?;
        let mut snapshot = Snapshot::default();
        if self.record_probabilities {
            let probabilities: Vec<f64> = amplitudes.iter().map(Complex64::norm_sqr).collect();
            snapshot.probabilities_ket = Some(Snapshot::ket(&probabilities, self.labels.len()));
            snapshot.probabilities = Some(probabilities);
        }
        if self.record_statevector {
            snapshot.statevector = Some(amplitudes);
        }
        debug!(label, "recorded snapshot");
        self.snapshots.insert(label.to_string(), snapshot);
        Ok(())
    }

    /// Whether recording is switched on.
    pub fn recording(&self) -> bool {
        self.recording
    }

    pub fn take_snapshots(&mut self) -> BTreeMap<String, Snapshot> {
        std::mem::take(&mut self.snapshots)
    }

    pub fn take_probability_dumps(&mut self) -> Vec<ProbabilityDump> {
        std::mem::take(&mut self.probability_dumps)
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_u_matrix_special_cases() {
        let x = u_matrix(PI, 0.0, PI);
        // U(pi, 0, pi) is X up to a global phase of -i.
        assert!(x[0][0].norm() < 1e-12);
        assert!(close(x[0][1].norm(), 1.0));
        assert!(close(x[1][0].norm(), 1.0));
        assert!((x[0][1] - x[1][0]).norm() < 1e-12);

        let h = u_matrix(PI / 2.0, 0.0, PI);
        for row in h {
            for entry in row {
                assert!(close(entry.norm(), FRAC_1_SQRT_2));
            }
        }
    }

    #[test]
    fn test_add_variables_keeps_existing_state() {
        let mut sim = Simulator::seeded(1);
        sim.add_variables(1, "a");
        sim.apply_matrix(&X_MATRIX, &[], 0).unwrap();
        sim.add_variables(2, "b");

        assert_eq!(sim.num_qubits(), 3);
        assert_eq!(sim.labels().collect::<Vec<_>>(), vec!["a[0]", "b[0]", "b[1]"]);
        let probs = sim.probabilities().unwrap();
        // a[0] is the most significant bit.
        assert!(close(probs[0b100], 1.0));
        assert!(close(sim.total_probability(), 1.0));
    }

    #[test]
    fn test_bell_state_probabilities() {
        let mut sim = Simulator::seeded(3);
        sim.add_variables(2, "q");
        sim.apply_matrix(&H_MATRIX, &[], 0).unwrap();
        sim.apply_matrix(&X_MATRIX, &[0], 1).unwrap();

        let probs = sim.probabilities().unwrap();
        assert!(close(probs[0b00], 0.5));
        assert!(close(probs[0b11], 0.5));
        assert_eq!(sim.gate_count(), 2);

        for _ in 0..20 {
            let bits = sim.measure_all(false).unwrap();
            assert!(bits == "00" || bits == "11", "unexpected {bits}");
        }
    }

    #[test]
    fn test_measure_one_collapses() {
        let mut sim = Simulator::seeded(11);
        sim.add_variables(2, "q");
        sim.apply_matrix(&H_MATRIX, &[], 0).unwrap();
        sim.apply_matrix(&X_MATRIX, &[0], 1).unwrap();

        let first = sim.measure_one(0).unwrap();
        assert!(close(sim.total_probability(), 1.0));
        let second = sim.measure_one(1).unwrap();
        assert_eq!(first, second);
        assert_eq!(sim.gate_count(), 2);
    }

    #[test]
    fn test_measure_all_reset_state() {
        let mut sim = Simulator::seeded(5);
        sim.add_variables(3, "q");
        for q in 0..3 {
            sim.apply_matrix(&H_MATRIX, &[], q).unwrap();
        }
        let bits = sim.measure_all(true).unwrap();
        let index = usize::from_str_radix(&bits, 2).unwrap();
        assert!(close(sim.probabilities().unwrap()[index], 1.0));
        assert_eq!(sim.measure_all(false).unwrap(), bits);
    }

    #[test]
    fn test_reset_qubit_returns_to_zero() {
        let mut sim = Simulator::seeded(9);
        sim.add_variables(1, "q");
        sim.apply_matrix(&X_MATRIX, &[], 0).unwrap();
        sim.reset_qubit(0).unwrap();
        assert!(close(sim.probabilities().unwrap()[0], 1.0));
    }

    #[test]
    fn test_invalid_qubits() {
        let mut sim = Simulator::seeded(0);
        sim.add_variables(2, "q");
        assert!(matches!(
            sim.apply_matrix(&X_MATRIX, &[], 2),
            Err(SimError::QubitOutOfRange { qubit: 2, num_qubits: 2 })
        ));
        assert!(matches!(
            sim.apply_matrix(&X_MATRIX, &[1], 1),
            Err(SimError::ControlIsTarget(1))
        ));
        assert!(matches!(
            sim.measure_one(5),
            Err(SimError::QubitOutOfRange { .. })
        ));
    }

    #[test]
    fn test_reset_releases_nodes() {
        let mut sim = Simulator::seeded(0);
        sim.add_variables(3, "q");
        sim.apply_matrix(&H_MATRIX, &[], 1).unwrap();
        sim.reset();
        assert_eq!(sim.num_qubits(), 0);
        assert_eq!(sim.active_nodes(), 0);
        assert_eq!(sim.measure_all(false).unwrap(), "");
    }

    #[test]
    fn test_snapshot_only_when_enabled() {
        let mut sim = Simulator::seeded(0);
        sim.add_variables(1, "q");
        sim.record_snapshot("1").unwrap();
        assert!(sim.take_snapshots().is_empty());

        let config = SimConfig {
            display_probabilities: true,
            ..SimConfig::default()
        };
        use rand::SeedableRng;
        let mut sim = Simulator::new(&config, StdRng::seed_from_u64(0));
        sim.add_variables(1, "q");
        sim.apply_matrix(&H_MATRIX, &[], 0).unwrap();
        sim.record_snapshot("1").unwrap();
        let snapshots = sim.take_snapshots();
        let snapshot = &snapshots["1"];
        assert!(snapshot.statevector.is_none());
        assert_eq!(snapshot.probabilities_ket.as_ref().map(BTreeMap::len), Some(2));
    }

    #[test]
    fn test_probability_dump_labels() {
        let mut sim = Simulator::seeded(0);
        sim.add_variables(2, "q");
        let dump = sim.dump_probabilities().unwrap();
        assert_eq!(dump.labels, vec!["q[0]", "q[1]"]);
        assert!(close(dump.probabilities[0], 1.0));
    }

    #[test]
    fn test_compaction_keeps_state() {
        let config = SimConfig {
            complex_limit: 8,
            ..SimConfig::default()
        };
        use rand::SeedableRng;
        let mut sim = Simulator::new(&config, StdRng::seed_from_u64(0));
        sim.add_variables(3, "q");
        for step in 0..30 {
            let angle = 0.1 * f64::from(step);
            sim.apply_matrix(&u_matrix(angle, angle / 3.0, 0.2), &[], step as usize % 3)
                .unwrap();
            sim.apply_matrix(&X_MATRIX, &[step as usize % 3], (step as usize + 1) % 3)
                .unwrap();
        }
        assert!(close(sim.total_probability(), 1.0));
        assert!(sim.max_active_nodes() >= sim.active_nodes());
    }

    #[test]
    fn test_dense_views_refuse_wide_states() {
        let config = SimConfig {
            display_statevector: true,
            ..SimConfig::default()
        };
        use rand::SeedableRng;
        let mut sim = Simulator::new(&config, StdRng::seed_from_u64(0));
        sim.add_variables(quiver_dd::MAX_DENSE_VARS + 1, "q");

        assert!(matches!(
            sim.record_snapshot("wide"),
            Err(SimError::Dd(quiver_dd::DdError::DenseTooLarge { .. }))
        ));
        assert!(sim.dump_probabilities().is_err());
        assert!(sim.take_snapshots().is_empty());

        // Sampling never expands the state.
        let bits = sim.measure_all(false).unwrap();
        assert_eq!(bits.len(), quiver_dd::MAX_DENSE_VARS + 1);
        assert!(bits.chars().all(|b| b == '0'));
    }

    #[test]
    fn test_measure_all_walk_renormalises_each_level() {
        // Mass 1.008 passes the tolerance of 0.01 at the root; every level
        // below must see conditional probabilities summing to 1 again.
        let scale = Complex64::new(1.004_f64.sqrt(), 0.0);
        let zero = Complex64::new(0.0, 0.0);
        let scaled_identity = [[scale, zero], [zero, scale]];

        let mut sim = Simulator::seeded(8);
        sim.add_variables(4, "q");
        for q in 0..4 {
            sim.apply_matrix(&H_MATRIX, &[], q).unwrap();
        }
        sim.apply_matrix(&scaled_identity, &[], 2).unwrap();
        sim.apply_matrix(&scaled_identity, &[], 2).unwrap();
        assert!((sim.total_probability() - 1.008_016).abs() < 1e-6);

        for _ in 0..50 {
            assert_eq!(sim.measure_all(false).unwrap().len(), 4);
        }
        sim.apply_matrix(&scaled_identity, &[], 0).unwrap();
        sim.apply_matrix(&scaled_identity, &[], 0).unwrap();
        sim.apply_matrix(&scaled_identity, &[], 0).unwrap();
        assert!(matches!(
            sim.measure_all(false),
            Err(SimError::ProbabilityMismatch { .. })
        ));
    }
}
