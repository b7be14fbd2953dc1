//! Simulation Engine
//!
//! Produces synthetic observations for an [`ExperimentDesign`] by sweeping
//! the independent variable, evaluating the model through the domain's
//! generator and perturbing each sample with seeded, bounded noise.
//!
//! Generators are looked up in a registry keyed by [`Domain`] that is
//! populated when the engine is built. A design for a domain without a
//! registered generator is rejected.

pub mod generators;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::DEFAULT_SEED;
use crate::contracts::{Domain, ExperimentDesign, InvalidRange, MathModel, Observation, ValueRange};

pub use generators::{default_generators, DomainGenerator, NoiseContext, NoisePolicy};

/// Errors from running a simulation. Never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("Invalid sample count: {0} (must be at least 1)")]
    InvalidSampleCount(usize),

    #[error(transparent)]
    InvalidRange(#[from] InvalidRange),

    #[error("Invalid noise level: {0} (must be finite and non-negative)")]
    InvalidNoiseLevel(f64),

    #[error("No generator registered for domain {0}")]
    UnregisteredDomain(Domain),

    #[error("Model produced a non-finite value at x = {x}")]
    NonFiniteValue { x: f64 },
}

/// Evenly spaced points over `range`, both ends included.
///
/// A single sample sits at the midpoint.
pub fn sample_points(range: ValueRange, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![range.midpoint()],
        n => {
            let step = range.span() / (n - 1) as f64;
            let mut points: Vec<f64> = (0..n).map(|i| range.min + step * i as f64).collect();
            points[n - 1] = range.max;
            points
        }
    }
}

/// Bell-shaped draw in [-1, 1]: the mean of three uniforms.
fn bounded_noise(rng: &mut ChaCha8Rng) -> f64 {
    (0..3).map(|_| rng.gen_range(-1.0_f64..=1.0)).sum::<f64>() / 3.0
}

/// Domain-dispatching simulator.
pub struct SimulationEngine {
    generators: HashMap<Domain, Box<dyn DomainGenerator>>,
    default_seed: u64,
}

impl SimulationEngine {
    /// Engine with a generator for every domain.
    pub fn new() -> Self {
        let mut engine = Self::empty();
        for generator in default_generators() {
            engine.register(generator);
        }
        engine
    }

    /// Engine with no generators registered.
    pub fn empty() -> Self {
        Self {
            generators: HashMap::new(),
            default_seed: DEFAULT_SEED,
        }
    }

    /// Seed used when neither the call nor the design pins one.
    pub fn with_default_seed(mut self, seed: u64) -> Self {
        self.default_seed = seed;
        self
    }

    /// Register a generator, replacing any previous one for its domain.
    pub fn register(&mut self, generator: Box<dyn DomainGenerator>) {
        self.generators.insert(generator.domain(), generator);
    }

    pub fn with_generator(mut self, generator: Box<dyn DomainGenerator>) -> Self {
        self.register(generator);
        self
    }

    pub fn is_registered(&self, domain: Domain) -> bool {
        self.generators.contains_key(&domain)
    }

    /// Seed that `simulate` would use for this design and override.
    pub fn resolve_seed(&self, design: &ExperimentDesign, seed: Option<u64>) -> u64 {
        seed.or(design.seed).unwrap_or(self.default_seed)
    }

    /// Run the design against `model`.
    ///
    /// Seed resolution: `seed`, then `design.seed`, then the engine default.
    /// Exactly one noise draw is taken per sample, so identical seeds give
    /// identical outputs whatever the noise level.
    #[instrument(skip(self, design, model), fields(
        domain = %design.domain,
        sample_count = design.sample_count,
        noise_level = design.noise_level
    ))]
    pub fn simulate(
        &self,
        design: &ExperimentDesign,
        model: &MathModel,
        seed: Option<u64>,
    ) -> Result<Vec<Observation>, SimulationError> {
        if design.sample_count == 0 {
            return Err(SimulationError::InvalidSampleCount(design.sample_count));
        }
        design.value_range.check()?;
        if !design.noise_level.is_finite() || design.noise_level < 0.0 {
            return Err(SimulationError::InvalidNoiseLevel(design.noise_level));
        }
        let generator = self
            .generators
            .get(&design.domain)
            .ok_or(SimulationError::UnregisteredDomain(design.domain))?;

        let points = sample_points(design.value_range, design.sample_count);

        let mut scale: f64 = 0.0;
        for &x in &points {
            let prediction = model.evaluate(x);
            if !prediction.is_finite() {
                return Err(SimulationError::NonFiniteValue { x });
            }
            scale = scale.max(prediction.abs());
        }
        if scale == 0.0 {
            scale = 1.0;
        }
        let noise = NoiseContext { level: design.noise_level, scale };

        let seed = self.resolve_seed(design, seed);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let mut observations = Vec::with_capacity(points.len());
        for x in points {
            let raw = generator.generate(x, model, &noise);
            let measured = generator.perturb(raw, bounded_noise(&mut rng), &noise);
            if !measured.is_finite() {
                return Err(SimulationError::NonFiniteValue { x });
            }
            observations.push(Observation {
                independent_value: x,
                measured_value: measured,
            });
        }

        debug!(seed = seed, samples = observations.len(), "Simulation complete");
        Ok(observations)
    }
}

impl Default for SimulationEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{ModelForm, Variable};
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn arrhenius() -> MathModel {
        MathModel::from_pairs(
            ModelForm::Arrhenius,
            &[
                ("pre_exponential", 1.0e6),
                ("activation_energy", 50_000.0),
                ("gas_constant", 8.314),
            ],
            Variable::new("temperature", "K"),
            Variable::new("reaction_rate", "1/s"),
            ValueRange::new(280.0, 400.0).unwrap(),
        )
        .unwrap()
    }

    fn design(domain: Domain, sample_count: usize, noise_level: f64) -> ExperimentDesign {
        ExperimentDesign {
            id: Uuid::new_v4(),
            domain,
            independent_variable: "temperature".to_string(),
            value_range: ValueRange { min: 280.0, max: 400.0 },
            sample_count,
            fixed_parameters: BTreeMap::new(),
            noise_level,
            seed: None,
        }
    }

    #[test]
    fn test_sample_points() {
        let range = ValueRange::new(0.0, 10.0).unwrap();
        assert_eq!(sample_points(range, 1), vec![5.0]);
        assert_eq!(sample_points(range, 3), vec![0.0, 5.0, 10.0]);

        let points = sample_points(ValueRange::new(280.0, 400.0).unwrap(), 7);
        assert_eq!(points.len(), 7);
        assert_eq!(points[0], 280.0);
        assert_eq!(points[6], 400.0);
        assert!(points.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_sample_count_and_endpoints() {
        let engine = SimulationEngine::new();
        let observations = engine
            .simulate(&design(Domain::Chemistry, 10, 0.05), &arrhenius(), Some(1))
            .unwrap();
        assert_eq!(observations.len(), 10);
        assert_eq!(observations[0].independent_value, 280.0);
        assert_eq!(observations[9].independent_value, 400.0);
    }

    #[test]
    fn test_same_seed_same_output() {
        let engine = SimulationEngine::new();
        let d = design(Domain::Chemistry, 20, 0.2);
        let a = engine.simulate(&d, &arrhenius(), Some(7)).unwrap();
        let b = engine.simulate(&d, &arrhenius(), Some(7)).unwrap();
        let c = engine.simulate(&d, &arrhenius(), Some(8)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_zero_noise_matches_model() {
        let engine = SimulationEngine::new();
        let model = arrhenius();
        let observations = engine
            .simulate(&design(Domain::Chemistry, 10, 0.0), &model, None)
            .unwrap();
        for obs in &observations {
            assert_eq!(obs.measured_value, model.evaluate(obs.independent_value));
        }
        assert!(observations.windows(2).all(|w| w[0].measured_value < w[1].measured_value));
    }

    #[test]
    fn test_noise_is_bounded() {
        let engine = SimulationEngine::new();
        let model = arrhenius();
        let observations = engine
            .simulate(&design(Domain::Chemistry, 50, 0.1), &model, Some(3))
            .unwrap();
        for obs in observations {
            let predicted = model.evaluate(obs.independent_value);
            assert!((obs.measured_value - predicted).abs() <= 0.1 * predicted + 1e-12);
        }
    }

    #[test]
    fn test_invalid_designs() {
        let engine = SimulationEngine::new();
        let model = arrhenius();

        let err = engine.simulate(&design(Domain::Chemistry, 0, 0.0), &model, None).unwrap_err();
        assert_eq!(err, SimulationError::InvalidSampleCount(0));

        let mut inverted = design(Domain::Chemistry, 5, 0.0);
        inverted.value_range = ValueRange { min: 400.0, max: 280.0 };
        assert!(matches!(
            engine.simulate(&inverted, &model, None),
            Err(SimulationError::InvalidRange(_))
        ));

        let err = engine.simulate(&design(Domain::Chemistry, 5, -0.1), &model, None).unwrap_err();
        assert!(matches!(err, SimulationError::InvalidNoiseLevel(_)));
    }

    #[test]
    fn test_unregistered_domain() {
        let engine = SimulationEngine::empty().with_generator(Box::new(generators::PhysicsGenerator));
        assert!(engine.is_registered(Domain::Physics));
        let err = engine
            .simulate(&design(Domain::Chemistry, 5, 0.0), &arrhenius(), None)
            .unwrap_err();
        assert_eq!(err, SimulationError::UnregisteredDomain(Domain::Chemistry));
    }

    #[test]
    fn test_non_finite_model_output() {
        let engine = SimulationEngine::new();
        let model = MathModel::from_pairs(
            ModelForm::PowerLaw,
            &[("coefficient", 1.0), ("exponent", 0.5)],
            Variable::new("x", ""),
            Variable::new("y", ""),
            ValueRange::new(-4.0, 4.0).unwrap(),
        )
        .unwrap();
        let mut d = design(Domain::Chemistry, 5, 0.0);
        d.value_range = ValueRange { min: -4.0, max: 4.0 };
        assert!(matches!(
            engine.simulate(&d, &model, None),
            Err(SimulationError::NonFiniteValue { .. })
        ));
    }

    #[test]
    fn test_seed_resolution() {
        let engine = SimulationEngine::new().with_default_seed(11);
        let mut d = design(Domain::Physics, 3, 0.0);
        assert_eq!(engine.resolve_seed(&d, None), 11);
        d.seed = Some(5);
        assert_eq!(engine.resolve_seed(&d, None), 5);
        assert_eq!(engine.resolve_seed(&d, Some(9)), 9);
    }
}
