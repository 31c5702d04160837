//! Run configuration plus the tuning constants that are not (yet) exposed as
//! config keys.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Number of greedy sampling operations per inner-loop length, performed
/// before annealing to calibrate the start temperature and the
/// acceptance-ratio thresholds.
pub const SAMPLING_LOOP_FACTOR: usize = 2;

/// Tiles per axis of the thermal-distribution grid.
pub const THERMAL_GRID_DIM: usize = 16;

/// Per-layer growth of the thermal accumulation weight. The heatsink sits
/// under layer 0; each layer above dissipates this much worse.
pub const HEAT_ACCUMULATION: f64 = 0.5;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    #[default]
    Minimal,
    Medium,
    Maximum,
}

impl Verbosity {
    /// The tracing level filter this verbosity maps onto.
    pub fn filter(self) -> &'static str {
        match self {
            Verbosity::Minimal => "info",
            Verbosity::Medium => "debug",
            Verbosity::Maximum => "trace",
        }
    }
}

/// All run parameters. Deserialized from a TOML file of flat `key = value`
/// lines; unknown keys are rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Number of dies in the stack.
    pub layers: usize,
    /// Fixed die outline.
    pub outline_x: f64,
    pub outline_y: f64,

    /// Inner-loop size factor: the inner loop runs
    /// `loop_factor * |blocks|^(4/3)` operations.
    pub loop_factor: f64,
    /// Number of outer (temperature) steps.
    pub loop_limit: usize,

    /// Start temperature as a multiple of the sampled cost deviation.
    pub temp_init_factor: f64,
    /// Acceptance-ratio thresholds between the cooling phases, as multiples
    /// of the sampled acceptance ratio.
    pub temp_phase_trans_12_factor: f64,
    pub temp_phase_trans_23_factor: f64,
    /// Cooling multipliers for fast cooling, slow cooling, and reheating.
    pub temp_factor_phase1: f64,
    pub temp_factor_phase2: f64,
    pub temp_factor_phase3: f64,

    /// Cost-term weights.
    pub cost_area_outline: f64,
    #[serde(rename = "cost_WL")]
    pub cost_wl: f64,
    #[serde(rename = "cost_TSVs")]
    pub cost_tsvs: f64,
    pub cost_temp: f64,
    pub cost_align: f64,

    pub seed: u64,

    #[serde(default)]
    pub log_level: Verbosity,
}

impl Config {
    pub fn load(path: &Path) -> Result<Config> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(Error::Config(msg));
        if self.layers == 0 {
            return fail("layers must be at least 1".into());
        }
        if self.outline_x <= 0.0 || self.outline_y <= 0.0 {
            return fail(format!(
                "outline must be positive, got {} x {}",
                self.outline_x, self.outline_y
            ));
        }
        if self.loop_factor <= 0.0 {
            return fail(format!("loop_factor must be positive, got {}", self.loop_factor));
        }
        if self.loop_limit == 0 {
            return fail("loop_limit must be at least 1".into());
        }
        if self.temp_init_factor <= 0.0 {
            return fail(format!(
                "temp_init_factor must be positive, got {}",
                self.temp_init_factor
            ));
        }
        if self.temp_phase_trans_12_factor <= self.temp_phase_trans_23_factor {
            return fail(format!(
                "temp_phase_trans_12_factor ({}) must exceed temp_phase_trans_23_factor ({})",
                self.temp_phase_trans_12_factor, self.temp_phase_trans_23_factor
            ));
        }
        for (name, f) in [
            ("temp_factor_phase1", self.temp_factor_phase1),
            ("temp_factor_phase2", self.temp_factor_phase2),
        ] {
            if f <= 0.0 || f > 1.0 {
                return fail(format!("{name} must be in (0, 1], got {f}"));
            }
        }
        if self.temp_factor_phase3 <= 0.0 {
            return fail(format!(
                "temp_factor_phase3 must be positive, got {}",
                self.temp_factor_phase3
            ));
        }
        // Phase one divides by this weight.
        if self.cost_area_outline <= 0.0 {
            return fail(format!(
                "cost_area_outline must be positive, got {}",
                self.cost_area_outline
            ));
        }
        for (name, w) in [
            ("cost_WL", self.cost_wl),
            ("cost_TSVs", self.cost_tsvs),
            ("cost_temp", self.cost_temp),
            ("cost_align", self.cost_align),
        ] {
            if w < 0.0 {
                return fail(format!("{name} must not be negative, got {w}"));
            }
        }
        Ok(())
    }

    pub fn outline_aspect_ratio(&self) -> f64 {
        self.outline_x / self.outline_y
    }
}

#[cfg(test)]
pub(crate) fn test_config(layers: usize, outline_x: f64, outline_y: f64) -> Config {
    Config {
        layers,
        outline_x,
        outline_y,
        loop_factor: 1.0,
        loop_limit: 50,
        temp_init_factor: 20.0,
        temp_phase_trans_12_factor: 0.7,
        temp_phase_trans_23_factor: 0.5,
        temp_factor_phase1: 0.9,
        temp_factor_phase2: 0.97,
        temp_factor_phase3: 1.2,
        cost_area_outline: 0.5,
        cost_wl: 0.2,
        cost_tsvs: 0.1,
        cost_temp: 0.1,
        cost_align: 0.1,
        seed: 0,
        log_level: Verbosity::Minimal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
layers = 2
outline_x = 10.0
outline_y = 10.0
loop_factor = 1.0
loop_limit = 128
temp_init_factor = 20.0
temp_phase_trans_12_factor = 0.7
temp_phase_trans_23_factor = 0.5
temp_factor_phase1 = 0.9
temp_factor_phase2 = 0.97
temp_factor_phase3 = 1.2
cost_area_outline = 0.5
cost_WL = 0.2
cost_TSVs = 0.1
cost_temp = 0.1
cost_align = 0.1
seed = 42
log_level = "medium"
"#;

    #[test]
    fn parses_all_keys() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        config.validate().unwrap();
        assert_eq!(config.layers, 2);
        assert_eq!(config.cost_wl, 0.2);
        assert_eq!(config.cost_tsvs, 0.1);
        assert_eq!(config.seed, 42);
        assert_eq!(config.log_level, Verbosity::Medium);
    }

    #[test]
    fn log_level_defaults_to_minimal() {
        let without = SAMPLE.replace("log_level = \"medium\"\n", "");
        let config: Config = toml::from_str(&without).unwrap();
        assert_eq!(config.log_level, Verbosity::Minimal);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let bad = format!("{SAMPLE}\nbogus = 1\n");
        assert!(toml::from_str::<Config>(&bad).is_err());
    }

    #[test]
    fn validation_catches_bad_values() {
        let mut config = test_config(1, 10.0, 10.0);
        config.layers = 0;
        assert!(config.validate().is_err());

        let mut config = test_config(1, 10.0, 10.0);
        config.cost_area_outline = 0.0;
        assert!(config.validate().is_err());

        let mut config = test_config(1, 10.0, 10.0);
        config.temp_factor_phase1 = 1.5;
        assert!(config.validate().is_err());
    }
}
