//! Statistical Analyzer
//!
//! Reconciles simulated observations with a model's predictions: Pearson
//! correlation, absolute and squared error, a least-squares fit of measured
//! on predicted, a correlation p-value and a single confidence score.

use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::{ConfidenceWeights, FitThresholds, InvestigationConfig};
use crate::contracts::{AnalysisResult, MathModel, Observation, RegressionFit};

/// Errors from analysis. Fatal for the experiment stage.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("No observations to analyse")]
    EmptyObservations,

    #[error("Observation {index} is not finite")]
    NonFiniteObservation { index: usize },

    #[error("Model prediction at x = {x} is not finite")]
    NonFinitePrediction { x: f64 },
}

/// Compares observations with model predictions.
#[derive(Debug, Clone, Default)]
pub struct StatisticalAnalyzer {
    thresholds: FitThresholds,
    weights: ConfidenceWeights,
}

impl StatisticalAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &InvestigationConfig) -> Self {
        Self {
            thresholds: config.fit_thresholds,
            weights: config.confidence_weights,
        }
    }

    /// Analyse `observations` against `model`.
    #[instrument(skip(self, observations, model), fields(samples = observations.len()))]
    pub fn analyze(
        &self,
        observations: &[Observation],
        model: &MathModel,
    ) -> Result<AnalysisResult, AnalysisError> {
        if observations.is_empty() {
            return Err(AnalysisError::EmptyObservations);
        }

        let mut predicted = Vec::with_capacity(observations.len());
        let mut measured = Vec::with_capacity(observations.len());
        for (index, obs) in observations.iter().enumerate() {
            if !obs.independent_value.is_finite() || !obs.measured_value.is_finite() {
                return Err(AnalysisError::NonFiniteObservation { index });
            }
            let p = model.evaluate(obs.independent_value);
            if !p.is_finite() {
                return Err(AnalysisError::NonFinitePrediction { x: obs.independent_value });
            }
            predicted.push(p);
            measured.push(obs.measured_value);
        }

        let n = observations.len();
        let correlation = pearson(&predicted, &measured);

        let residuals: Vec<f64> = predicted.iter().zip(&measured).map(|(p, m)| m - p).collect();
        let mean_absolute_error = residuals.iter().map(|r| r.abs()).sum::<f64>() / n as f64;
        let root_mean_squared_error =
            (residuals.iter().map(|r| r * r).sum::<f64>() / n as f64).sqrt();

        let confidence_score = self.confidence(correlation, mean_absolute_error, &measured);
        let fit_quality = self.thresholds.classify(correlation);
        let regression = least_squares(&predicted, &measured, correlation);
        let p_value = correlation_p_value(correlation, n);

        debug!(
            correlation = correlation,
            mae = mean_absolute_error,
            confidence = confidence_score,
            fit = %fit_quality,
            "Analysis complete"
        );

        Ok(AnalysisResult {
            correlation,
            mean_absolute_error,
            confidence_score,
            fit_quality,
            root_mean_squared_error,
            regression,
            p_value,
            sample_count: n,
        })
    }

    /// Weighted mix of positive correlation and inverse normalized error.
    ///
    /// The error is normalized by the mean absolute measurement, or by one
    /// when every measurement is zero.
    fn confidence(&self, correlation: f64, mae: f64, measured: &[f64]) -> f64 {
        let mean_magnitude = measured.iter().map(|m| m.abs()).sum::<f64>() / measured.len() as f64;
        let scale = if mean_magnitude > 0.0 { mean_magnitude } else { 1.0 };
        let error_term = 1.0 / (1.0 + mae / scale);
        let score = self.weights.correlation * correlation.max(0.0) + self.weights.error * error_term;
        score.clamp(0.0, 1.0)
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Pearson r, zero when either series has no variance.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.len() < 2 {
        return 0.0;
    }
    let (mx, my) = (mean(x), mean(y));
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y) {
        let (dx, dy) = (a - mx, b - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return 0.0;
    }
    (sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0)
}

fn least_squares(x: &[f64], y: &[f64], correlation: f64) -> Option<RegressionFit> {
    if x.len() < 2 {
        return None;
    }
    let (mx, my) = (mean(x), mean(y));
    let sxx: f64 = x.iter().map(|a| (a - mx).powi(2)).sum();
    if sxx == 0.0 {
        return None;
    }
    let sxy: f64 = x.iter().zip(y).map(|(a, b)| (a - mx) * (b - my)).sum();
    let slope = sxy / sxx;
    Some(RegressionFit {
        slope,
        intercept: my - slope * mx,
        r_squared: correlation * correlation,
    })
}

/// Two-sided p-value for H0: rho = 0.
fn correlation_p_value(r: f64, n: usize) -> Option<f64> {
    if n < 3 {
        return None;
    }
    let df = (n - 2) as f64;
    let denom = 1.0 - r * r;
    if denom <= 0.0 {
        return Some(0.0);
    }
    let t = r.abs() * (df / denom).sqrt();
    Some(t_test_p_value(t, df).clamp(0.0, 1.0))
}

/// Two-sided Student-t p-value.
fn t_test_p_value(t: f64, df: f64) -> f64 {
    if df > 30.0 {
        // Normal approximation
        let p = 0.5 * (1.0 + erf(t / std::f64::consts::SQRT_2));
        2.0 * (1.0 - p)
    } else {
        incomplete_beta(df / 2.0, 0.5, df / (df + t * t))
    }
}

/// Error function (Abramowitz and Stegun 7.1.26).
fn erf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    sign * y
}

/// Regularized incomplete beta I_x(a, b).
fn incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let bt = (ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln()).exp();

    if x < (a + 1.0) / (a + b + 2.0) {
        bt * beta_cf(a, b, x) / a
    } else {
        1.0 - bt * beta_cf(b, a, 1.0 - x) / b
    }
}

/// Continued fraction for the incomplete beta (Lentz).
fn beta_cf(a: f64, b: f64, x: f64) -> f64 {
    const MAX_ITER: usize = 200;
    const EPS: f64 = 1e-12;
    const TINY: f64 = 1e-30;

    let guard = |v: f64| if v.abs() < TINY { TINY } else { v };

    let mut c = 1.0;
    let mut d = 1.0 / guard(1.0 - (a + b) * x / (a + 1.0));
    let mut h = d;

    for m in 1..=MAX_ITER {
        let m = m as f64;
        let m2 = 2.0 * m;

        let aa = m * (b - m) * x / ((a + m2 - 1.0) * (a + m2));
        d = 1.0 / guard(1.0 + aa * d);
        c = guard(1.0 + aa / c);
        h *= d * c;

        let aa = -(a + m) * (a + b + m) * x / ((a + m2) * (a + m2 + 1.0));
        d = 1.0 / guard(1.0 + aa * d);
        c = guard(1.0 + aa / c);
        let del = d * c;
        h *= del;

        if (del - 1.0).abs() < EPS {
            break;
        }
    }

    h
}

/// Log gamma (Lanczos, g = 7).
fn ln_gamma(x: f64) -> f64 {
    const G: f64 = 7.0;
    const C: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];

    if x < 0.5 {
        std::f64::consts::PI.ln() - (std::f64::consts::PI * x).sin().ln() - ln_gamma(1.0 - x)
    } else {
        let x = x - 1.0;
        let mut a = C[0];
        for (i, c) in C.iter().enumerate().skip(1) {
            a += c / (x + i as f64);
        }
        let t = x + G + 0.5;
        0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + a.ln()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{FitQuality, ModelForm, ValueRange, Variable};

    fn linear() -> MathModel {
        MathModel::from_pairs(
            ModelForm::Linear,
            &[("slope", 2.0), ("intercept", 1.0)],
            Variable::new("x", ""),
            Variable::new("y", ""),
            ValueRange::new(0.0, 10.0).unwrap(),
        )
        .unwrap()
    }

    fn obs(points: &[(f64, f64)]) -> Vec<Observation> {
        points
            .iter()
            .map(|&(x, y)| Observation { independent_value: x, measured_value: y })
            .collect()
    }

    #[test]
    fn test_perfect_agreement() {
        let model = linear();
        let observations: Vec<Observation> = (0..10)
            .map(|i| {
                let x = i as f64;
                Observation { independent_value: x, measured_value: model.evaluate(x) }
            })
            .collect();

        let result = StatisticalAnalyzer::new().analyze(&observations, &model).unwrap();
        assert!((result.correlation - 1.0).abs() < 1e-12);
        assert_eq!(result.mean_absolute_error, 0.0);
        assert_eq!(result.fit_quality, FitQuality::Strong);
        assert!(result.confidence_score >= 0.99);
        let fit = result.regression.unwrap();
        assert!((fit.slope - 1.0).abs() < 1e-9);
        assert!(fit.intercept.abs() < 1e-9);
        assert!(result.p_value.unwrap() < 1e-6);
    }

    #[test]
    fn test_anti_correlation_has_low_confidence() {
        let model = linear();
        let observations = obs(&[(0.0, 19.0), (2.0, 15.0), (4.0, 11.0), (6.0, 7.0), (8.0, 3.0)]);
        let result = StatisticalAnalyzer::new().analyze(&observations, &model).unwrap();
        assert!(result.correlation < -0.99);
        // |r| buckets the fit, but negative r contributes nothing to confidence.
        assert_eq!(result.fit_quality, FitQuality::Strong);
        assert!(result.confidence_score < 0.4);
    }

    #[test]
    fn test_zero_variance_gives_zero_correlation() {
        let model = linear();
        let observations = obs(&[(1.0, 5.0), (2.0, 5.0), (3.0, 5.0)]);
        let result = StatisticalAnalyzer::new().analyze(&observations, &model).unwrap();
        assert_eq!(result.correlation, 0.0);
        assert_eq!(result.fit_quality, FitQuality::None);

        let single = obs(&[(1.0, 3.0)]);
        let result = StatisticalAnalyzer::new().analyze(&single, &model).unwrap();
        assert_eq!(result.correlation, 0.0);
        assert!(result.regression.is_none());
        assert!(result.p_value.is_none());
    }

    #[test]
    fn test_empty_and_non_finite() {
        let model = linear();
        assert_eq!(
            StatisticalAnalyzer::new().analyze(&[], &model),
            Err(AnalysisError::EmptyObservations)
        );
        let bad = obs(&[(1.0, 3.0), (2.0, f64::NAN)]);
        assert_eq!(
            StatisticalAnalyzer::new().analyze(&bad, &model),
            Err(AnalysisError::NonFiniteObservation { index: 1 })
        );
    }

    #[test]
    fn test_bounds_hold() {
        let model = linear();
        let observations = obs(&[(0.0, 4.0), (1.0, -2.0), (2.0, 9.0), (3.0, 0.5), (4.0, 30.0)]);
        let result = StatisticalAnalyzer::new().analyze(&observations, &model).unwrap();
        assert!((-1.0..=1.0).contains(&result.correlation));
        assert!((0.0..=1.0).contains(&result.confidence_score));
        assert!(result.mean_absolute_error >= 0.0);
        let p = result.p_value.unwrap();
        assert!((0.0..=1.0).contains(&p));
    }

    #[test]
    fn test_p_value_behaviour() {
        assert!(correlation_p_value(0.0, 10).unwrap() > 0.99);
        assert!(correlation_p_value(0.95, 10).unwrap() < 0.001);
        assert!(correlation_p_value(0.3, 100).unwrap() < 0.01);
    }

    #[test]
    fn test_p_value_matches_student_t() {
        let cases = [
            // (r, n, two-sided p from the t distribution with n - 2 df)
            (0.5, 10, 0.1411),
            (0.3, 20, 0.1989),
            (0.1, 5, 0.8729),
            (0.6, 12, 0.0391),
        ];
        for (r, n, expected) in cases {
            let p = correlation_p_value(r, n).unwrap();
            assert!((p - expected).abs() < 1e-3, "p(r={}, n={}) = {}, expected {}", r, n, p, expected);
        }
    }

    #[test]
    fn test_ln_gamma() {
        assert!(ln_gamma(1.0).abs() < 1e-9);
        assert!(ln_gamma(2.0).abs() < 1e-9);
        // Gamma(5) = 24
        assert!((ln_gamma(5.0) - 24f64.ln()).abs() < 1e-9);
        // Gamma(10) = 362880
        assert!((ln_gamma(10.0) - 362880f64.ln()).abs() < 1e-9);
        assert!((ln_gamma(0.5) - std::f64::consts::PI.sqrt().ln()).abs() < 1e-9);
        // Gamma(0.25) via reflection
        assert!((ln_gamma(0.25) - 3.625_609_908_221_908f64.ln()).abs() < 1e-9);
    }

    #[test]
    fn test_incomplete_beta_symmetric_case() {
        // I_x(a, a) at x = 0.5 is 0.5 by symmetry.
        for a in [0.5, 1.0, 2.5, 7.0] {
            assert!((incomplete_beta(a, a, 0.5) - 0.5).abs() < 1e-9);
        }
        // I_x(1, 1) = x
        assert!((incomplete_beta(1.0, 1.0, 0.3) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_random_measurements_rarely_fit() {
        use rand::{Rng, SeedableRng};
        use rand_chacha::ChaCha8Rng;

        let model = linear();
        let mut poor = 0;
        for seed in 0..200u64 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let observations: Vec<Observation> = (0..30)
                .map(|i| Observation {
                    independent_value: i as f64 / 3.0,
                    measured_value: rng.gen_range(0.0..21.0),
                })
                .collect();
            let result = StatisticalAnalyzer::new().analyze(&observations, &model).unwrap();
            if matches!(result.fit_quality, FitQuality::None | FitQuality::Weak) {
                poor += 1;
            }
        }
        assert!(poor >= 195, "only {} of 200 random runs had a none/weak fit", poor);
    }
}
