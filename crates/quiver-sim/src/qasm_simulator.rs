//! Multi-shot driver over a QASM program.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use quiver_qasm::QasmCompiler;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, instrument};

use crate::config::SimConfig;
use crate::engine::Simulator;
use crate::error::{SimError, SimResult};
use crate::report::{SimulationReport, SimulationStats};

/// Compiles a QASM program into a [`Simulator`] and samples it.
///
/// # Example
///
/// ```rust
/// use quiver_sim::{QasmSimulator, SimConfig};
///
/// let source = r#"
///     OPENQASM 2.0;
///     include "qelib1.inc";
///     qreg q[2];
///     h q[0];
///     cx q[0], q[1];
/// "#;
///
/// let config = SimConfig { seed: Some(7), ..SimConfig::default() };
/// let mut sim = QasmSimulator::from_source("bell.qasm", source, config).unwrap();
/// let report = sim.simulate(100).unwrap();
///
/// assert_eq!(report.total_counts(), 100);
/// assert!(report.counts.keys().all(|bits| bits == "00" || bits == "11"));
/// ```
pub struct QasmSimulator {
    compiler: QasmCompiler,
    engine: Simulator,
    config: SimConfig,
    seed: u64,
    compiled: bool,
}

#[allow(clippy::cast_possible_truncation)]
impl QasmSimulator {
    /// Simulate the program in `path`.
    pub fn from_file(path: &Path, config: SimConfig) -> SimResult<Self> {
        let compiler = QasmCompiler::from_file(path)?;
        Self::build(compiler, config)
    }

    /// Simulate an in-memory program.
    pub fn from_source(name: &str, source: &str, config: SimConfig) -> SimResult<Self> {
        Self::build(QasmCompiler::new(name, source), config)
    }

    fn build(compiler: QasmCompiler, config: SimConfig) -> SimResult<Self> {
        config.validate()?;
        let seed = config.seed.unwrap_or_else(clock_seed);
        info!(seed, "seeded random generator");
        let engine = Simulator::new(&config, StdRng::seed_from_u64(seed));
        Ok(Self {
            compiler,
            engine,
            config,
            seed,
            compiled: false,
        })
    }

    /// Seed in use.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// The engine, holding the state left by the last shot.
    pub fn engine(&self) -> &Simulator {
        &self.engine
    }

    /// Run `shots` shots and collect the histogram.
    ///
    /// A program without `measure` or `reset` is compiled once and every
    /// shot samples the final state. Otherwise the first shot samples the
    /// state the compile pass left behind, and every further shot starts
    /// from scratch with a new compile pass.
    #[instrument(skip(self), fields(source = %self.compiler.source_name()))]
    pub fn simulate(&mut self, shots: u32) -> SimResult<SimulationReport> {
        if shots == 0 {
            return Err(SimError::InvalidShots(shots));
        }
        let start = Instant::now();

        if self.compiled {
            self.restart();
        }
        self.engine.set_recording(true);
        self.compiler.run(&mut self.engine)?;
        self.compiled = true;

        let mut counts = BTreeMap::new();
        if self.compiler.intermediate_measurement() {
            debug!(shots, "intermediate measurement, recompiling every shot");
            *counts.entry(self.engine.measure_all(false)?).or_insert(0) += 1;
            self.engine.set_recording(false);
            for _ in 1..shots {
                self.restart();
                self.compiler.run(&mut self.engine)?;
                *counts.entry(self.engine.measure_all(false)?).or_insert(0) += 1;
            }
        } else {
            for shot in 0..shots {
                *counts.entry(self.engine.measure_all(false)?).or_insert(0) += 1;
                if shot > 0 && shot % 10_000 == 0 {
                    debug!(shot, "sampling");
                }
            }
        }

        let elapsed = start.elapsed();
        let stats = self.config.collect_stats.then(|| SimulationStats {
            qubits: self.engine.num_qubits(),
            applied_gates: self.engine.gate_count(),
            max_active_nodes: self.engine.max_active_nodes(),
            simulation_time: elapsed.as_secs_f64(),
        });
        info!(
            shots,
            outcomes = counts.len(),
            gates = self.engine.gate_count(),
            elapsed_ms = elapsed.as_millis() as u64,
            "simulation finished"
        );

        Ok(SimulationReport {
            counts,
            shots,
            seed: self.seed,
            snapshots: self.engine.take_snapshots(),
            probability_dumps: self.engine.take_probability_dumps(),
            stats,
        })
    }

    fn restart(&mut self) {
        self.engine.reset();
        self.compiler.rewind();
    }
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}
