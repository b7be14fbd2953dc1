//! Investigation Configuration
//!
//! Immutable settings consumed by the coordinator and agents at
//! construction time. Values come from defaults, an optional TOML file and
//! then environment overrides:
//!
//! - `SCI_LAB_LLM_TIMEOUT_SECS`: language-model call timeout in seconds
//! - `SCI_LAB_SEED`: default seed for simulated noise
//! - `SCI_LAB_FALLBACK_DOMAIN`: domain used when no keyword matches
//! - `SCI_LAB_NARRATIVE`: `true`/`false`, ask the model for a discussion

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use validator::Validate;

use crate::contracts::{Domain, FitQuality};

/// Seed used when neither the caller nor the configuration pins one.
pub const DEFAULT_SEED: u64 = 42;

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Validation(String),

    #[error("Invalid value '{value}' for {var}")]
    Environment { var: &'static str, value: String },
}

impl From<validator::ValidationErrors> for ConfigError {
    fn from(err: validator::ValidationErrors) -> Self {
        ConfigError::Validation(err.to_string())
    }
}

/// Experiment defaults for one domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct DomainDefaults {
    #[validate(range(min = 1, max = 100000))]
    pub sample_count: usize,

    #[validate(range(min = 0.0, max = 1.0))]
    pub noise_level: f64,
}

impl Default for DomainDefaults {
    fn default() -> Self {
        Self { sample_count: 25, noise_level: 0.05 }
    }
}

/// Experiment defaults for every domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DomainTable {
    #[validate(nested)]
    pub physics: DomainDefaults,
    #[validate(nested)]
    pub chemistry: DomainDefaults,
    #[validate(nested)]
    pub biology: DomainDefaults,
    #[validate(nested)]
    pub environmental: DomainDefaults,
    #[validate(nested)]
    pub engineering: DomainDefaults,
    #[validate(nested)]
    pub medicine: DomainDefaults,
}

impl Default for DomainTable {
    fn default() -> Self {
        let d = |sample_count, noise_level| DomainDefaults { sample_count, noise_level };
        Self {
            physics: d(30, 0.02),
            chemistry: d(25, 0.05),
            biology: d(40, 0.15),
            environmental: d(36, 0.10),
            engineering: d(25, 0.05),
            medicine: d(30, 0.08),
        }
    }
}

impl DomainTable {
    pub fn get(&self, domain: Domain) -> DomainDefaults {
        match domain {
            Domain::Physics => self.physics,
            Domain::Chemistry => self.chemistry,
            Domain::Biology => self.biology,
            Domain::Environmental => self.environmental,
            Domain::Engineering => self.engineering,
            Domain::Medicine => self.medicine,
        }
    }
}

/// Minimum |r| for each fit bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct FitThresholds {
    #[validate(range(min = 0.0, max = 1.0))]
    pub strong: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub moderate: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub weak: f64,
}

impl Default for FitThresholds {
    fn default() -> Self {
        Self { strong: 0.9, moderate: 0.7, weak: 0.4 }
    }
}

impl FitThresholds {
    /// Bucket a correlation coefficient.
    pub fn classify(&self, correlation: f64) -> FitQuality {
        let r = correlation.abs();
        if r >= self.strong {
            FitQuality::Strong
        } else if r >= self.moderate {
            FitQuality::Moderate
        } else if r >= self.weak {
            FitQuality::Weak
        } else {
            FitQuality::None
        }
    }
}

/// Confidence cut-offs for the collector's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct VerdictThresholds {
    /// Minimum confidence for `supported`
    #[validate(range(min = 0.0, max = 1.0))]
    pub supported: f64,
    /// Confidence below which a fit of `none` is `refuted`
    #[validate(range(min = 0.0, max = 1.0))]
    pub refuted: f64,
}

impl Default for VerdictThresholds {
    fn default() -> Self {
        Self { supported: 0.6, refuted: 0.3 }
    }
}

/// Weights of the two confidence components; they must sum to one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct ConfidenceWeights {
    #[validate(range(min = 0.0, max = 1.0))]
    pub correlation: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub error: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self { correlation: 0.6, error: 0.4 }
    }
}

/// Settings for a whole investigation run.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct InvestigationConfig {
    /// Per-domain experiment defaults
    #[validate(nested)]
    pub domains: DomainTable,

    #[validate(nested)]
    pub fit_thresholds: FitThresholds,

    #[validate(nested)]
    pub verdict_thresholds: VerdictThresholds,

    #[validate(nested)]
    pub confidence_weights: ConfidenceWeights,

    /// Domain chosen when no keyword matches
    pub fallback_domain: Domain,

    /// Seed for simulated noise when the caller does not pin one
    pub seed: u64,

    /// Prior used when the model response carries no confidence line
    #[validate(range(min = 0.0, max = 1.0))]
    pub default_confidence_prior: f64,

    /// Timeout for every language-model call
    #[validate(range(min = 1, max = 3600))]
    pub llm_timeout_secs: u64,

    /// Ask the language model for a narrative discussion during collection
    pub narrative: bool,
}

impl Default for InvestigationConfig {
    fn default() -> Self {
        Self {
            domains: DomainTable::default(),
            fit_thresholds: FitThresholds::default(),
            verdict_thresholds: VerdictThresholds::default(),
            confidence_weights: ConfidenceWeights::default(),
            fallback_domain: Domain::Physics,
            seed: DEFAULT_SEED,
            default_confidence_prior: 0.7,
            llm_timeout_secs: 120,
            narrative: true,
        }
    }
}

impl InvestigationConfig {
    /// Load from an optional TOML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                Self::from_toml_str(&raw)?
            }
            None => Self::default(),
        };
        let config = config.with_overrides(|key| std::env::var(key).ok())?;
        config.check()?;
        Ok(config)
    }

    /// Parse and validate a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.check()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in `load`).
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("SCI_LAB_LLM_TIMEOUT_SECS") {
            self.llm_timeout_secs = value.trim().parse().map_err(|_| ConfigError::Environment {
                var: "SCI_LAB_LLM_TIMEOUT_SECS",
                value: value.clone(),
            })?;
        }
        if let Some(value) = lookup("SCI_LAB_SEED") {
            self.seed = value.trim().parse().map_err(|_| ConfigError::Environment {
                var: "SCI_LAB_SEED",
                value: value.clone(),
            })?;
        }
        if let Some(value) = lookup("SCI_LAB_FALLBACK_DOMAIN") {
            self.fallback_domain = value.parse().map_err(|_| ConfigError::Environment {
                var: "SCI_LAB_FALLBACK_DOMAIN",
                value: value.clone(),
            })?;
        }
        if let Some(value) = lookup("SCI_LAB_NARRATIVE") {
            self.narrative = value.trim().parse().map_err(|_| ConfigError::Environment {
                var: "SCI_LAB_NARRATIVE",
                value: value.clone(),
            })?;
        }
        Ok(self)
    }

    /// Field ranges plus the cross-field rules derive cannot express.
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate()?;

        let t = &self.fit_thresholds;
        if !(t.strong >= t.moderate && t.moderate >= t.weak) {
            return Err(ConfigError::Validation(format!(
                "fit thresholds must be ordered strong >= moderate >= weak, got {} / {} / {}",
                t.strong, t.moderate, t.weak
            )));
        }

        let v = &self.verdict_thresholds;
        if v.refuted > v.supported {
            return Err(ConfigError::Validation(format!(
                "refuted threshold {} exceeds supported threshold {}",
                v.refuted, v.supported
            )));
        }

        let w = &self.confidence_weights;
        if ((w.correlation + w.error) - 1.0).abs() > 1e-9 {
            return Err(ConfigError::Validation(format!(
                "confidence weights must sum to 1, got {}",
                w.correlation + w.error
            )));
        }

        Ok(())
    }

    pub fn domain_defaults(&self, domain: Domain) -> DomainDefaults {
        self.domains.get(domain)
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = InvestigationConfig::default();
        assert!(config.check().is_ok());
        assert_eq!(config.domain_defaults(Domain::Biology).noise_level, 0.15);
        assert_eq!(config.llm_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_fit_thresholds_classify() {
        let t = FitThresholds::default();
        assert_eq!(t.classify(0.95), FitQuality::Strong);
        assert_eq!(t.classify(-0.75), FitQuality::Moderate);
        assert_eq!(t.classify(0.5), FitQuality::Weak);
        assert_eq!(t.classify(0.1), FitQuality::None);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = InvestigationConfig::from_toml_str(
            r#"
            seed = 7
            fallback_domain = "chemistry"

            [domains.physics]
            sample_count = 12
            noise_level = 0.0
            "#,
        )
        .unwrap();

        assert_eq!(config.seed, 7);
        assert_eq!(config.fallback_domain, Domain::Chemistry);
        assert_eq!(config.domain_defaults(Domain::Physics).sample_count, 12);
        assert_eq!(config.domain_defaults(Domain::Medicine).sample_count, 30);
        assert_eq!(config.llm_timeout_secs, 120);
    }

    #[test]
    fn test_invalid_toml_values_are_rejected() {
        let err = InvestigationConfig::from_toml_str(
            r#"
            [domains.biology]
            sample_count = 0
            noise_level = 0.1
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        let err = InvestigationConfig::from_toml_str(
            r#"
            [fit_thresholds]
            strong = 0.5
            moderate = 0.7
            weak = 0.4
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_overrides() {
        let config = InvestigationConfig::default()
            .with_overrides(|key| match key {
                "SCI_LAB_SEED" => Some("99".to_string()),
                "SCI_LAB_NARRATIVE" => Some("false".to_string()),
                "SCI_LAB_FALLBACK_DOMAIN" => Some("medicine".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.seed, 99);
        assert!(!config.narrative);
        assert_eq!(config.fallback_domain, Domain::Medicine);

        let err = InvestigationConfig::default()
            .with_overrides(|key| (key == "SCI_LAB_LLM_TIMEOUT_SECS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Environment { var: "SCI_LAB_LLM_TIMEOUT_SECS", .. }));
    }
}
