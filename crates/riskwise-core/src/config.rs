//! Engine configuration
//!
//! Config is loaded with a two-layer resolution:
//! 1. Check for an override (explicit path, or ~/.local/share/riskwise/config/engine.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Keys missing from an override keep their default values.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::IncomeLevel;

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/engine.toml");

/// Training run parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub sample_count: usize,
    pub epochs: usize,
    pub batch_size: usize,
    /// Fraction of samples held out for validation (0.0-<1.0)
    pub validation_split: f64,
    pub learning_rate: f64,
    pub dropout: f64,
    /// Hidden layer widths, input to output
    pub hidden_layers: Vec<usize>,
    /// Samples generated per chunk before reporting progress
    pub generation_chunk: usize,
    /// Fixed seed for generation and weight init (random when unset)
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            sample_count: 20_000,
            epochs: 50,
            batch_size: 128,
            validation_split: 0.2,
            learning_rate: 0.001,
            dropout: 0.2,
            hidden_layers: vec![64, 32, 16],
            generation_chunk: 100,
            seed: None,
        }
    }
}

/// Tier thresholds for scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Probability at or above which a transaction is High risk
    pub high_threshold: f64,
    /// Probability at or above which a transaction is Medium risk
    pub medium_threshold: f64,
    /// Probability above which a transaction is flagged
    pub suspicious_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            high_threshold: 0.7,
            medium_threshold: 0.3,
            suspicious_threshold: 0.5,
        }
    }
}

/// Sampling probability of each income bracket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomePrior {
    pub low: f64,
    pub middle: f64,
    pub upper: f64,
}

impl IncomePrior {
    pub fn weight(&self, level: IncomeLevel) -> f64 {
        match level {
            IncomeLevel::Low => self.low,
            IncomeLevel::Middle => self.middle,
            IncomeLevel::Upper => self.upper,
        }
    }
}

impl Default for IncomePrior {
    fn default() -> Self {
        Self {
            low: 1.0 / 3.0,
            middle: 1.0 / 3.0,
            upper: 1.0 / 3.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub income_prior: IncomePrior,
}

/// Full engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub training: TrainingConfig,
    pub scoring: ScoringConfig,
    pub generator: GeneratorConfig,
}

impl EngineConfig {
    /// Load from the default override location, falling back to embedded defaults
    pub fn load() -> Result<Self> {
        load_config(None)
    }

    /// Load from an explicit path (embedded defaults if it does not exist)
    pub fn load_from(path: &Path) -> Result<Self> {
        load_config(Some(path))
    }

    /// Parse a TOML document on top of the built-in defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        parse_config(content)
    }

    /// Reject inconsistent values
    pub fn validate(&self) -> Result<()> {
        let t = &self.training;
        if t.sample_count == 0 || t.epochs == 0 || t.batch_size == 0 {
            return Err(Error::Config(
                "sample_count, epochs and batch_size must be positive".to_string(),
            ));
        }
        if t.generation_chunk == 0 {
            return Err(Error::Config(
                "generation_chunk must be positive".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&t.validation_split) {
            return Err(Error::Config(format!(
                "validation_split must be in [0, 1), got {}",
                t.validation_split
            )));
        }
        if !(0.0..1.0).contains(&t.dropout) {
            return Err(Error::Config(format!(
                "dropout must be in [0, 1), got {}",
                t.dropout
            )));
        }
        if !(t.learning_rate > 0.0 && t.learning_rate.is_finite()) {
            return Err(Error::Config(format!(
                "learning_rate must be positive, got {}",
                t.learning_rate
            )));
        }
        if t.hidden_layers.iter().any(|w| *w == 0) {
            return Err(Error::Config(
                "hidden layer widths must be positive".to_string(),
            ));
        }

        let s = &self.scoring;
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !in_unit(s.high_threshold)
            || !in_unit(s.medium_threshold)
            || !in_unit(s.suspicious_threshold)
            || s.medium_threshold > s.high_threshold
        {
            return Err(Error::Config(format!(
                "scoring thresholds must satisfy 0 <= medium ({}) <= high ({}) <= 1",
                s.medium_threshold, s.high_threshold
            )));
        }

        let p = &self.generator.income_prior;
        let weights = [p.low, p.middle, p.upper];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) || weights.iter().sum::<f64>() <= 0.0
        {
            return Err(Error::Config(
                "income_prior weights must be non-negative and not all zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("riskwise").join("config").join("engine.toml"))
}

/// Load configuration (override first, then default)
fn load_config(override_path: Option<&Path>) -> Result<EngineConfig> {
    let path = override_path
        .map(Path::to_path_buf)
        .or_else(default_config_path);

    let content = match path {
        Some(ref path) if path.exists() => {
            debug!("Loading engine config from {}", path.display());
            fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Failed to read {}: {}", path.display(), e))
            })?
        }
        _ => DEFAULT_CONFIG.to_string(),
    };

    parse_config(&content)
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    training: Option<RawTraining>,
    scoring: Option<RawScoring>,
    generator: Option<RawGenerator>,
}

#[derive(Debug, Deserialize)]
struct RawTraining {
    sample_count: Option<usize>,
    epochs: Option<usize>,
    batch_size: Option<usize>,
    validation_split: Option<f64>,
    learning_rate: Option<f64>,
    dropout: Option<f64>,
    hidden_layers: Option<Vec<usize>>,
    generation_chunk: Option<usize>,
    seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawScoring {
    high_threshold: Option<f64>,
    medium_threshold: Option<f64>,
    suspicious_threshold: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawGenerator {
    income_prior: Option<RawIncomePrior>,
}

#[derive(Debug, Deserialize)]
struct RawIncomePrior {
    low: Option<f64>,
    middle: Option<f64>,
    upper: Option<f64>,
}

/// Parse config from TOML content
fn parse_config(content: &str) -> Result<EngineConfig> {
    let raw: RawConfig = toml::from_str(content)?;

    let mut config = EngineConfig::default();

    if let Some(training) = raw.training {
        let t = &mut config.training;
        if let Some(v) = training.sample_count {
            t.sample_count = v;
        }
        if let Some(v) = training.epochs {
            t.epochs = v;
        }
        if let Some(v) = training.batch_size {
            t.batch_size = v;
        }
        if let Some(v) = training.validation_split {
            t.validation_split = v;
        }
        if let Some(v) = training.learning_rate {
            t.learning_rate = v;
        }
        if let Some(v) = training.dropout {
            t.dropout = v;
        }
        if let Some(v) = training.hidden_layers {
            t.hidden_layers = v;
        }
        if let Some(v) = training.generation_chunk {
            t.generation_chunk = v;
        }
        if training.seed.is_some() {
            t.seed = training.seed;
        }
    }

    if let Some(scoring) = raw.scoring {
        let s = &mut config.scoring;
        if let Some(v) = scoring.high_threshold {
            s.high_threshold = v;
        }
        if let Some(v) = scoring.medium_threshold {
            s.medium_threshold = v;
        }
        if let Some(v) = scoring.suspicious_threshold {
            s.suspicious_threshold = v;
        }
    }

    if let Some(prior) = raw.generator.and_then(|g| g.income_prior) {
        let p = &mut config.generator.income_prior;
        if let Some(v) = prior.low {
            p.low = v;
        }
        if let Some(v) = prior.middle {
            p.middle = v;
        }
        if let Some(v) = prior.upper {
            p.upper = v;
        }
    }

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_default_config() {
        let config = parse_config(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.training.sample_count, 20_000);
        assert_eq!(config.training.epochs, 50);
        assert_eq!(config.training.hidden_layers, vec![64, 32, 16]);
        assert_eq!(config.scoring.high_threshold, 0.7);
        assert_eq!(config.scoring.medium_threshold, 0.3);
        assert!(config.training.seed.is_none());
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let config = EngineConfig::from_toml(
            r#"
            [training]
            epochs = 5
            seed = 42
            "#,
        )
        .unwrap();
        assert_eq!(config.training.epochs, 5);
        assert_eq!(config.training.seed, Some(42));
        assert_eq!(config.training.batch_size, 128);
        assert_eq!(config.scoring, ScoringConfig::default());
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(EngineConfig::from_toml("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        for doc in [
            "[training]\nepochs = 0",
            "[training]\nvalidation_split = 1.0",
            "[training]\ndropout = -0.1",
            "[training]\nhidden_layers = [64, 0]",
            "[scoring]\nmedium_threshold = 0.8",
            "[generator.income_prior]\nlow = 0.0\nmiddle = 0.0\nupper = 0.0",
        ] {
            let result = EngineConfig::from_toml(doc);
            assert!(matches!(result, Err(Error::Config(_))), "accepted: {}", doc);
        }
    }

    #[test]
    fn test_malformed_toml() {
        let result = EngineConfig::from_toml("[training\nepochs = 5");
        assert!(matches!(result, Err(Error::Toml(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[scoring]\nhigh_threshold = 0.8").unwrap();

        let config = EngineConfig::load_from(file.path()).unwrap();
        assert_eq!(config.scoring.high_threshold, 0.8);
        assert_eq!(config.scoring.medium_threshold, 0.3);
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load_from(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.training.sample_count, 20_000);
    }

    #[test]
    fn test_income_prior_weight() {
        let prior = IncomePrior {
            low: 0.5,
            middle: 0.3,
            upper: 0.2,
        };
        assert_eq!(prior.weight(IncomeLevel::Low), 0.5);
        assert_eq!(prior.weight(IncomeLevel::Upper), 0.2);
    }
}
