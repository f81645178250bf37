//! Run configuration, read from TOML.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Dimensions the binary is compiled for.
pub const SUPPORTED_DIMENSIONS: std::ops::RangeInclusive<usize> = 2..=6;

/// Parameters of a packing run. One independent compression is run per entry of
/// `max_packing_fractions`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub n: usize,
    pub dim: usize,
    pub initial_packing_fraction: f64,
    pub growth_rate: f64,
    pub temperature: f64,
    pub max_packing_fractions: Vec<f64>,
    pub max_pressure: f64,
    /// Events per sphere processed between synchronizations.
    pub events_per_cycle: usize,
    /// Radial kick coefficient applied to colliding pairs.
    pub separation_boost: f64,
    /// Start from a saved configuration instead of random placement.
    pub read_file: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub seed: Option<u64>,
    pub max_cycles: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            n: 1000,
            dim: 3,
            initial_packing_fraction: 0.01,
            growth_rate: 0.001,
            temperature: 0.2,
            max_packing_fractions: vec![0.64],
            max_pressure: 1000.0,
            events_per_cycle: 20,
            separation_boost: 2.0,
            read_file: None,
            output_dir: PathBuf::from("."),
            seed: None,
            max_cycles: None,
        }
    }
}

impl RunConfig {
    /// Read and validate a TOML file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::InvalidParam(format!("cannot encode configuration: {e}")))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Reject parameter sets no run could start from.
    pub fn validate(&self) -> Result<()> {
        if self.n == 0 {
            return Err(Error::InvalidParam("n must be > 0".into()));
        }
        if !SUPPORTED_DIMENSIONS.contains(&self.dim) {
            return Err(Error::InvalidParam(format!(
                "dim must be in {}..={}, got {}",
                SUPPORTED_DIMENSIONS.start(),
                SUPPORTED_DIMENSIONS.end(),
                self.dim
            )));
        }
        if !is_fraction(self.initial_packing_fraction) {
            return Err(Error::InvalidParam("initial_packing_fraction must lie in (0, 1)".into()));
        }
        if self.max_packing_fractions.is_empty() {
            return Err(Error::InvalidParam("max_packing_fractions must not be empty".into()));
        }
        for &pf in &self.max_packing_fractions {
            if !is_fraction(pf) || pf < self.initial_packing_fraction {
                return Err(Error::InvalidParam(format!(
                    "target packing fraction {pf} must lie in [initial_packing_fraction, 1)"
                )));
            }
        }
        if !self.growth_rate.is_finite() || self.growth_rate < 0.0 {
            return Err(Error::InvalidParam("growth_rate must be finite and >= 0".into()));
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(Error::InvalidParam("temperature must be finite and >= 0".into()));
        }
        if self.max_pressure.is_nan() || self.max_pressure <= 0.0 {
            return Err(Error::InvalidParam("max_pressure must be > 0".into()));
        }
        if self.events_per_cycle == 0 {
            return Err(Error::InvalidParam("events_per_cycle must be > 0".into()));
        }
        if !self.separation_boost.is_finite() || self.separation_boost < 0.0 {
            return Err(Error::InvalidParam("separation_boost must be finite and >= 0".into()));
        }
        if self.max_cycles == Some(0) {
            return Err(Error::InvalidParam("max_cycles must be > 0 when set".into()));
        }
        Ok(())
    }
}

fn is_fraction(x: f64) -> bool {
    x.is_finite() && x > 0.0 && x < 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() -> Result<()> {
        RunConfig::default().validate()
    }

    #[test]
    fn partial_file_fills_defaults() -> Result<()> {
        let config = RunConfig::from_toml(
            r#"
            n = 500
            dim = 2
            max_packing_fractions = [0.7, 0.8]
            seed = 42
            "#,
        )?;
        assert_eq!(config.n, 500);
        assert_eq!(config.dim, 2);
        assert_eq!(config.max_packing_fractions, vec![0.7, 0.8]);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.events_per_cycle, RunConfig::default().events_per_cycle);
        Ok(())
    }

    #[test]
    fn toml_round_trip() -> Result<()> {
        let config = RunConfig {
            seed: Some(7),
            read_file: Some(PathBuf::from("struct_0.dat")),
            max_cycles: Some(100),
            ..RunConfig::default()
        };
        assert_eq!(RunConfig::from_toml(&config.to_toml()?)?, config);
        Ok(())
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            RunConfig::from_toml("spheres = 10"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let bad = [
            RunConfig { n: 0, ..RunConfig::default() },
            RunConfig { dim: 7, ..RunConfig::default() },
            RunConfig { dim: 1, ..RunConfig::default() },
            RunConfig { initial_packing_fraction: 0.0, ..RunConfig::default() },
            RunConfig { max_packing_fractions: vec![], ..RunConfig::default() },
            RunConfig { max_packing_fractions: vec![0.005], ..RunConfig::default() },
            RunConfig { growth_rate: -1.0, ..RunConfig::default() },
            RunConfig { temperature: f64::NAN, ..RunConfig::default() },
            RunConfig { events_per_cycle: 0, ..RunConfig::default() },
            RunConfig { max_cycles: Some(0), ..RunConfig::default() },
        ];
        for config in bad {
            assert!(config.validate().is_err(), "accepted {config:?}");
        }
    }

    #[test]
    fn load_reads_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("run.toml");
        let config = RunConfig { n: 64, ..RunConfig::default() };
        config.save(&path)?;
        assert_eq!(RunConfig::load(&path)?, config);
        Ok(())
    }
}
