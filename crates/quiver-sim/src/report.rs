//! Results of a simulation run.

use std::collections::BTreeMap;
use std::fmt;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Probabilities below this are left out of the ket listing of a snapshot.
const KET_THRESHOLD: f64 = 1e-10;

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    /// Measured bitstring → number of shots. Bitstrings list `q[0]` of the
    /// first register leftmost.
    pub counts: BTreeMap<String, u32>,
    /// Number of shots taken.
    pub shots: u32,
    /// Seed of the random generator, for reproducing the run.
    pub seed: u64,
    /// State recorded at `snapshot` statements, by label.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub snapshots: BTreeMap<String, Snapshot>,
    /// Output of `show_probabilities` statements in program order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub probability_dumps: Vec<ProbabilityDump>,
    /// Run statistics, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<SimulationStats>,
}

impl SimulationReport {
    /// Total number of counted shots.
    pub fn total_counts(&self) -> u32 {
        self.counts.values().sum()
    }

    /// The most frequent bitstring, the smallest one on ties.
    pub fn most_frequent(&self) -> Option<(&str, u32)> {
        self.counts
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(bits, &count)| (bits.as_str(), count))
    }
}

/// State captured at a `snapshot` statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Snapshot {
    /// All amplitudes, indexed like [`probabilities`](Self::probabilities).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statevector: Option<Vec<Complex64>>,
    /// Probability of every basis state. Bit `v` of the index is variable
    /// `v`, so the last qubit declared is the least significant bit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<Vec<f64>>,
    /// Non-negligible probabilities keyed by bitstring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probabilities_ket: Option<BTreeMap<String, f64>>,
}

impl Snapshot {
    /// Build the ket listing from dense probabilities over `num_qubits`.
    pub fn ket(probabilities: &[f64], num_qubits: usize) -> BTreeMap<String, f64> {
        probabilities
            .iter()
            .enumerate()
            .filter(|(_, p)| **p > KET_THRESHOLD)
            .map(|(i, p)| (basis_label(i, num_qubits), *p))
            .collect()
    }
}

/// Output of one `show_probabilities` statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityDump {
    /// Qubit labels, most significant first.
    pub labels: Vec<String>,
    /// Probability of every basis state, indexed as in [`Snapshot`].
    pub probabilities: Vec<f64>,
}

impl fmt::Display for ProbabilityDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "|{}>", self.labels.join(" "))?;
        for (i, p) in self.probabilities.iter().enumerate() {
            writeln!(f, "|{}>: {p}", basis_label(i, self.labels.len()))?;
        }
        Ok(())
    }
}

/// Run statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationStats {
    /// Number of qubits in the circuit.
    pub qubits: usize,
    /// Gates applied, over all compile passes.
    pub applied_gates: u64,
    /// Peak number of referenced diagram nodes.
    pub max_active_nodes: usize,
    /// Wall time of the whole run in seconds.
    pub simulation_time: f64,
}

/// `index` as `width` binary digits, most significant first.
pub(crate) fn basis_label(index: usize, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    format!("{index:0width$b}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probability_dump_format() {
        let dump = ProbabilityDump {
            labels: vec!["q[0]".into(), "q[1]".into()],
            probabilities: vec![0.5, 0.0, 0.0, 0.5],
        };
        assert_eq!(
            dump.to_string(),
            "|q[0] q[1]>\n|00>: 0.5\n|01>: 0\n|10>: 0\n|11>: 0.5\n"
        );
    }

    #[test]
    fn test_ket_skips_negligible_states() {
        let ket = Snapshot::ket(&[0.5, 1e-14, 0.0, 0.5], 2);
        assert_eq!(ket.len(), 2);
        assert_eq!(ket.get("11"), Some(&0.5));
    }

    #[test]
    fn test_report_json_omits_empty_sections() {
        let report = SimulationReport {
            counts: BTreeMap::from([("00".to_string(), 3), ("11".to_string(), 5)]),
            shots: 8,
            seed: 1,
            snapshots: BTreeMap::new(),
            probability_dumps: Vec::new(),
            stats: None,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["counts"]["11"], 5);
        assert!(json.get("snapshots").is_none());
        assert!(json.get("stats").is_none());
        assert_eq!(report.total_counts(), 8);
        assert_eq!(report.most_frequent(), Some(("11", 5)));
    }

    #[test]
    fn test_basis_label() {
        assert_eq!(basis_label(5, 4), "0101");
        assert_eq!(basis_label(0, 0), "");
    }
}
