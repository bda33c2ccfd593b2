//! Simulator configuration.
//!
//! Supports loading configuration from:
//! 1. A YAML file
//! 2. Environment variables (with `QUIVER_` prefix)
//!
//! Precedence (highest to lowest): command-line overrides applied by the
//! caller, environment variables, configuration file, default values.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{SimError, SimResult};

/// Settings for one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed of the random generator. Derived from the wall clock when unset.
    pub seed: Option<u64>,

    /// Number of shots.
    pub shots: u32,

    /// Allowed deviation of the total probability from 1 at a measurement.
    pub tolerance: f64,

    /// Tolerance under which two complex weights are the same table entry.
    pub precision: f64,

    /// Record amplitudes at `snapshot` statements.
    pub display_statevector: bool,

    /// Record probabilities at `snapshot` statements.
    pub display_probabilities: bool,

    /// Initial weight-table size that triggers compaction.
    pub complex_limit: usize,

    /// Include gate count, timing and peak node count in the report.
    pub collect_stats: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: None,
            shots: 1,
            tolerance: 0.01,
            precision: quiver_dd::DEFAULT_TOLERANCE,
            display_statevector: false,
            display_probabilities: false,
            complex_limit: 10_000,
            collect_stats: false,
        }
    }
}

impl SimConfig {
    /// Load a configuration file. Missing keys keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> SimResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| SimError::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;

        let config: SimConfig =
            serde_yaml_ng::from_str(&contents).map_err(|e| SimError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, then the optional file, then the environment.
    pub fn load(config_file: Option<&Path>) -> SimResult<Self> {
        let config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = config.merge_env();
        config.validate()?;
        Ok(config)
    }

    /// Override fields from `QUIVER_SEED`, `QUIVER_SHOTS`,
    /// `QUIVER_TOLERANCE` and `QUIVER_PRECISION`.
    pub fn merge_env(self) -> Self {
        self.merge_vars(|key| std::env::var(key).ok())
    }

    /// Like [`merge_env`](Self::merge_env) with an explicit variable source.
    ///
    /// Values that do not parse are ignored with a warning.
    pub fn merge_vars<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("QUIVER_SEED") {
            match v.parse() {
                Ok(seed) => self.seed = Some(seed),
                Err(_) => warn!(value = %v, "ignoring invalid QUIVER_SEED"),
            }
        }
        if let Some(v) = lookup("QUIVER_SHOTS") {
            match v.parse() {
                Ok(shots) => self.shots = shots,
                Err(_) => warn!(value = %v, "ignoring invalid QUIVER_SHOTS"),
            }
        }
        if let Some(v) = lookup("QUIVER_TOLERANCE") {
            match v.parse() {
                Ok(tolerance) => self.tolerance = tolerance,
                Err(_) => warn!(value = %v, "ignoring invalid QUIVER_TOLERANCE"),
            }
        }
        if let Some(v) = lookup("QUIVER_PRECISION") {
            match v.parse() {
                Ok(precision) => self.precision = precision,
                Err(_) => warn!(value = %v, "ignoring invalid QUIVER_PRECISION"),
            }
        }
        self
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> SimResult<()> {
        if self.shots == 0 {
            return Err(SimError::InvalidShots(0));
        }
        if !(self.tolerance > 0.0 && self.tolerance.is_finite()) {
            return Err(SimError::InvalidConfig(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if !(self.precision > 0.0 && self.precision < 1.0) {
            return Err(SimError::InvalidConfig(format!(
                "precision must be in (0, 1), got {}",
                self.precision
            )));
        }
        if self.complex_limit == 0 {
            return Err(SimError::InvalidConfig(
                "complex_limit must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
