//! Experiment Contracts
//!
//! Design, raw observations and statistical analysis of a simulated
//! experiment.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use super::domain::Domain;
use super::model::ValueRange;

/// Parameters of a simulated experiment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentDesign {
    /// Unique design identifier
    pub id: Uuid,

    /// Domain whose generator produces the data
    pub domain: Domain,

    /// Name of the swept variable
    pub independent_variable: String,

    /// Sweep range, inclusive of both ends
    pub value_range: ValueRange,

    /// Number of evenly spaced samples
    pub sample_count: usize,

    /// Parameters held fixed during the sweep
    pub fixed_parameters: BTreeMap<String, f64>,

    /// Relative noise amplitude, non-negative
    pub noise_level: f64,

    /// Seed for the noise generator, if pinned
    pub seed: Option<u64>,
}

/// One simulated measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub independent_value: f64,
    pub measured_value: f64,
}

/// Qualitative agreement between model and data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitQuality {
    None,
    Weak,
    Moderate,
    Strong,
}

impl FitQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Weak => "weak",
            Self::Moderate => "moderate",
            Self::Strong => "strong",
        }
    }
}

impl fmt::Display for FitQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Least-squares fit of measured values against model predictions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

/// Statistical comparison of observations against model predictions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Pearson correlation, in [-1, 1]
    pub correlation: f64,

    /// Mean absolute prediction error, non-negative
    pub mean_absolute_error: f64,

    /// Combined confidence score, in [0, 1]
    pub confidence_score: f64,

    /// Qualitative fit bucket derived from |correlation|
    pub fit_quality: FitQuality,

    /// Root mean squared prediction error
    pub root_mean_squared_error: f64,

    /// Measured-on-predicted regression
    pub regression: Option<RegressionFit>,

    /// Two-sided p-value for the correlation; absent below three samples
    pub p_value: Option<f64>,

    /// Number of observations analysed
    pub sample_count: usize,
}

/// Design, data and analysis of one experiment run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentResult {
    pub design: ExperimentDesign,
    pub observations: Vec<Observation>,
    pub analysis: AnalysisResult,
}

impl ExperimentResult {
    /// Mean, min and max of the measured values.
    pub fn measured_summary(&self) -> Option<(f64, f64, f64)> {
        if self.observations.is_empty() {
            return None;
        }
        let values = self.observations.iter().map(|o| o.measured_value);
        let (mut min, mut max, mut sum) = (f64::INFINITY, f64::NEG_INFINITY, 0.0);
        for v in values {
            min = min.min(v);
            max = max.max(v);
            sum += v;
        }
        Some((sum / self.observations.len() as f64, min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_quality_ordering() {
        assert!(FitQuality::Strong > FitQuality::Moderate);
        assert!(FitQuality::Weak > FitQuality::None);
        assert_eq!(serde_json::to_string(&FitQuality::Moderate).unwrap(), "\"moderate\"");
    }
}
