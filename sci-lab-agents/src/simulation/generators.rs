//! Domain Generators
//!
//! Each generator turns a model prediction into a simulated measurement
//! for one domain. Generators agree on one contract: with a noise level of
//! zero they reproduce the model exactly, and every output respects the
//! domain floor.

use crate::contracts::{Domain, MathModel};

/// How noise combines with the noiseless signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoisePolicy {
    /// `value + level * scale * draw`
    Additive,
    /// `value * (1 + level * draw)`
    Multiplicative,
}

/// Noise parameters shared by every sample of one simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseContext {
    /// Relative noise amplitude from the design
    pub level: f64,
    /// Largest absolute prediction over the design; scales additive noise
    pub scale: f64,
}

/// Produces raw signal and applies noise for one domain.
pub trait DomainGenerator: Send + Sync {
    /// Domain the generator is registered under.
    fn domain(&self) -> Domain;

    fn noise_policy(&self) -> NoisePolicy;

    /// Lowest physically meaningful measurement, if any.
    fn floor(&self) -> Option<f64> {
        None
    }

    /// Noiseless signal at `x`.
    fn generate(&self, x: f64, model: &MathModel, _noise: &NoiseContext) -> f64 {
        model.evaluate(x)
    }

    /// Combine the raw signal with a noise draw in [-1, 1] and clamp.
    fn perturb(&self, raw: f64, draw: f64, noise: &NoiseContext) -> f64 {
        let value = match self.noise_policy() {
            NoisePolicy::Additive => raw + noise.level * noise.scale * draw,
            NoisePolicy::Multiplicative => raw * (1.0 + noise.level * draw),
        };
        match self.floor() {
            Some(floor) => value.max(floor),
            None => value,
        }
    }
}

/// Signed mechanical and thermal quantities; instrument noise is additive.
#[derive(Debug, Default, Clone, Copy)]
pub struct PhysicsGenerator;

impl DomainGenerator for PhysicsGenerator {
    fn domain(&self) -> Domain {
        Domain::Physics
    }

    fn noise_policy(&self) -> NoisePolicy {
        NoisePolicy::Additive
    }
}

/// Rates and concentrations; scatter grows with magnitude.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChemistryGenerator;

impl DomainGenerator for ChemistryGenerator {
    fn domain(&self) -> Domain {
        Domain::Chemistry
    }

    fn noise_policy(&self) -> NoisePolicy {
        NoisePolicy::Multiplicative
    }

    fn floor(&self) -> Option<f64> {
        Some(0.0)
    }
}

/// Populations and metabolic rates; biological variability is relative.
#[derive(Debug, Default, Clone, Copy)]
pub struct BiologyGenerator;

impl DomainGenerator for BiologyGenerator {
    fn domain(&self) -> Domain {
        Domain::Biology
    }

    fn noise_policy(&self) -> NoisePolicy {
        NoisePolicy::Multiplicative
    }

    fn floor(&self) -> Option<f64> {
        Some(0.0)
    }
}

/// Field measurements with a slow periodic disturbance on top of the model.
#[derive(Debug, Clone, Copy)]
pub struct EnvironmentalGenerator {
    /// Angular frequency of the periodic term, per unit of `x`
    pub seasonal_frequency: f64,
    /// Periodic amplitude relative to `level * scale`
    pub seasonal_weight: f64,
}

impl Default for EnvironmentalGenerator {
    fn default() -> Self {
        Self { seasonal_frequency: 0.1, seasonal_weight: 0.5 }
    }
}

impl DomainGenerator for EnvironmentalGenerator {
    fn domain(&self) -> Domain {
        Domain::Environmental
    }

    fn noise_policy(&self) -> NoisePolicy {
        NoisePolicy::Additive
    }

    fn generate(&self, x: f64, model: &MathModel, noise: &NoiseContext) -> f64 {
        let seasonal = self.seasonal_weight
            * noise.level
            * noise.scale
            * (self.seasonal_frequency * x).sin();
        model.evaluate(x) + seasonal
    }
}

/// Load tests and efficiency curves; readings cannot go negative.
#[derive(Debug, Default, Clone, Copy)]
pub struct EngineeringGenerator;

impl DomainGenerator for EngineeringGenerator {
    fn domain(&self) -> Domain {
        Domain::Engineering
    }

    fn noise_policy(&self) -> NoisePolicy {
        NoisePolicy::Additive
    }

    fn floor(&self) -> Option<f64> {
        Some(0.0)
    }
}

/// Dose responses and plasma levels; patient variability is additive.
#[derive(Debug, Default, Clone, Copy)]
pub struct MedicineGenerator;

impl DomainGenerator for MedicineGenerator {
    fn domain(&self) -> Domain {
        Domain::Medicine
    }

    fn noise_policy(&self) -> NoisePolicy {
        NoisePolicy::Additive
    }

    fn floor(&self) -> Option<f64> {
        Some(0.0)
    }
}

/// One generator per domain.
pub fn default_generators() -> Vec<Box<dyn DomainGenerator>> {
    vec![
        Box::new(PhysicsGenerator),
        Box::new(ChemistryGenerator),
        Box::new(BiologyGenerator),
        Box::new(EnvironmentalGenerator::default()),
        Box::new(EngineeringGenerator),
        Box::new(MedicineGenerator),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{ModelForm, ValueRange, Variable};

    fn linear(slope: f64) -> MathModel {
        MathModel::from_pairs(
            ModelForm::Linear,
            &[("slope", slope), ("intercept", 0.0)],
            Variable::new("x", ""),
            Variable::new("y", ""),
            ValueRange::new(0.0, 10.0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_every_domain_has_a_generator() {
        let generators = default_generators();
        for domain in Domain::ALL {
            assert!(generators.iter().any(|g| g.domain() == domain));
        }
    }

    #[test]
    fn test_zero_noise_reproduces_model() {
        let model = linear(2.0);
        let noise = NoiseContext { level: 0.0, scale: 20.0 };
        for generator in default_generators() {
            let raw = generator.generate(3.0, &model, &noise);
            assert_eq!(generator.perturb(raw, 0.8, &noise), 6.0);
        }
    }

    #[test]
    fn test_policies() {
        let noise = NoiseContext { level: 0.1, scale: 50.0 };
        assert!((ChemistryGenerator.perturb(10.0, 1.0, &noise) - 11.0).abs() < 1e-12);
        assert!((PhysicsGenerator.perturb(10.0, 1.0, &noise) - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_floor_clamps() {
        let noise = NoiseContext { level: 1.0, scale: 10.0 };
        assert_eq!(EngineeringGenerator.perturb(1.0, -1.0, &noise), 0.0);
        assert_eq!(MedicineGenerator.perturb(0.5, -0.9, &noise), 0.0);
        assert!(PhysicsGenerator.perturb(1.0, -1.0, &noise) < 0.0);
    }
}
