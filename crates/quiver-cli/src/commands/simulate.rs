//! Simulate command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use quiver_sim::{QasmSimulator, SimConfig};

use super::common::{check_input, print_json, print_table, read_stdin};

/// Settings given on the command line. They win over the config file and
/// the environment.
#[derive(Debug, Default)]
pub struct Overrides {
    pub shots: Option<u32>,
    pub seed: Option<u64>,
    pub precision: Option<f64>,
    pub tolerance: Option<f64>,
    pub display_statevector: bool,
    pub display_probabilities: bool,
    pub print_stats: bool,
}

impl Overrides {
    fn apply(&self, mut config: SimConfig) -> SimConfig {
        if let Some(shots) = self.shots {
            config.shots = shots;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(precision) = self.precision {
            config.precision = precision;
        }
        if let Some(tolerance) = self.tolerance {
            config.tolerance = tolerance;
        }
        config.display_statevector |= self.display_statevector;
        config.display_probabilities |= self.display_probabilities;
        config.collect_stats |= self.print_stats;
        config
    }
}

/// Layer defaults, config file, environment and flags.
pub fn resolve_config(config_file: Option<&Path>, overrides: &Overrides) -> Result<SimConfig> {
    let config = SimConfig::load(config_file).context("Failed to load configuration")?;
    let config = overrides.apply(config);
    config.validate()?;
    Ok(config)
}

/// Execute the simulate command.
pub fn execute(
    input: Option<&Path>,
    config_file: Option<&Path>,
    overrides: &Overrides,
    table: bool,
) -> Result<()> {
    let config = resolve_config(config_file, overrides)?;
    let shots = config.shots;

    let mut simulator = match input {
        Some(path) => {
            check_input(path)?;
            info!(input = %path.display(), shots, "simulating");
            QasmSimulator::from_file(path, config)?
        }
        None => {
            let source = read_stdin()?;
            info!(shots, "simulating circuit from stdin");
            QasmSimulator::from_source("<stdin>", &source, config)?
        }
    };

    let report = simulator.simulate(shots)?;

    if table {
        print_table(&report);
    } else {
        print_json(&report)?;
    }
    Ok(())
}
