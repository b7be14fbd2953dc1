//! Knowledge Base
//!
//! Domain principles the theoretical agent cites when it builds a
//! hypothesis. [`StaticKnowledgeBase`] ships a curated in-memory table;
//! other backends implement [`KnowledgeBase`].

use crate::classifier::{mentions, tokenize};
use crate::contracts::Domain;

/// Lookup of established principles for a domain.
pub trait KnowledgeBase: Send + Sync {
    /// Principles relevant to `topic` within `domain`. An empty list is valid.
    fn lookup(&self, domain: Domain, topic: &str) -> Vec<String>;

    /// Reference texts for `domain`.
    fn sources(&self, _domain: Domain) -> Vec<String> {
        Vec::new()
    }
}

struct Entry {
    topics: &'static [&'static str],
    principle: &'static str,
}

const fn entry(topics: &'static [&'static str], principle: &'static str) -> Entry {
    Entry { topics, principle }
}

const PHYSICS: &[Entry] = &[
    entry(&["force", "acceleration", "motion", "mass", "momentum"], "Newton's second law: F = m * a"),
    entry(&["energy", "velocity", "motion"], "Kinetic energy: E = 0.5 * m * v^2"),
    entry(
        &["oscillation", "pendulum", "spring", "vibration", "wave"],
        "Damped harmonic motion: x(t) = A * exp(-g * t) * cos(2 * pi * f * t)",
    ),
    entry(&["temperature", "heat", "thermal", "pressure"], "Ideal gas law: P * V = n * R * T"),
    entry(&["electromagnetic", "magnetic", "voltage", "current"], "Ohm's law: V = I * R"),
    entry(&[], "Conservation of energy: energy is neither created nor destroyed"),
];

const CHEMISTRY: &[Entry] = &[
    entry(
        &["temperature", "rate", "reaction", "kinetics", "activation"],
        "Arrhenius equation: k = A * exp(-Ea / (R * T))",
    ),
    entry(&["concentration", "rate", "order"], "Rate law: rate = k * [A]^n"),
    entry(&["ph", "acid", "enzyme", "catalyst"], "Catalytic activity peaks near an optimum pH"),
    entry(&["equilibrium", "pressure"], "Le Chatelier's principle: an equilibrium shifts to oppose a change"),
    entry(&[], "Collision theory: reactions need collisions with sufficient energy and orientation"),
];

const BIOLOGY: &[Entry] = &[
    entry(
        &["population", "growth", "ecosystem", "bacteria"],
        "Logistic growth: dN/dt = r * N * (1 - N / K)",
    ),
    entry(
        &["light", "photosynthesis", "plant", "plants", "enzyme", "nutrient"],
        "Michaelis-Menten kinetics: v = Vmax * S / (Km + S)",
    ),
    entry(&["evolution", "species", "gene"], "Natural selection acts on heritable variation"),
    entry(&[], "Homeostasis: organisms regulate their internal conditions"),
];

const ENVIRONMENTAL: &[Entry] = &[
    entry(
        &["co2", "carbon", "greenhouse", "climate", "warming"],
        "Radiative forcing grows with the logarithm of CO2 concentration",
    ),
    entry(
        &["pollution", "air", "quality", "health", "emission", "emissions"],
        "Exposure-response curves saturate at high pollutant levels",
    ),
    entry(
        &["humidity", "temperature"],
        "Relative humidity depends on temperature through saturation vapour pressure",
    ),
    entry(&[], "Mass balance: inputs minus outputs equals accumulation"),
];

const ENGINEERING: &[Entry] = &[
    entry(
        &["stress", "strain", "material", "load", "beam"],
        "Hooke's law: stress = E * strain within the elastic limit",
    ),
    entry(
        &["efficiency", "power", "turbine", "performance"],
        "Efficiency peaks at the design operating point and falls off on either side",
    ),
    entry(&[], "Factor of safety: design capacity must exceed the expected load"),
];

const MEDICINE: &[Entry] = &[
    entry(
        &["dose", "dosage", "drug", "treatment", "response"],
        "Hill equation: E = Emax * C^n / (EC50^n + C^n)",
    ),
    entry(
        &["plasma", "concentration", "time", "clearance", "elimination"],
        "First-order elimination: C(t) = C0 * exp(-k * t)",
    ),
    entry(&[], "Therapeutic window: efficacy must be balanced against toxicity"),
];

fn entries(domain: Domain) -> &'static [Entry] {
    match domain {
        Domain::Physics => PHYSICS,
        Domain::Chemistry => CHEMISTRY,
        Domain::Biology => BIOLOGY,
        Domain::Environmental => ENVIRONMENTAL,
        Domain::Engineering => ENGINEERING,
        Domain::Medicine => MEDICINE,
    }
}

/// Curated principle table.
///
/// A lookup returns the domain's topic matches, or its general principles
/// when nothing matches. Thermal and rate topics also pull in the matching
/// physics or chemistry principle when asked from another domain.
#[derive(Debug, Clone, Default)]
pub struct StaticKnowledgeBase;

impl StaticKnowledgeBase {
    pub fn new() -> Self {
        Self
    }
}

impl KnowledgeBase for StaticKnowledgeBase {
    fn lookup(&self, domain: Domain, topic: &str) -> Vec<String> {
        let tokens = tokenize(topic);
        let table = entries(domain);

        let mut principles: Vec<String> = table
            .iter()
            .filter(|e| e.topics.iter().any(|t| mentions(&tokens, t)))
            .map(|e| e.principle.to_string())
            .collect();

        if principles.is_empty() {
            principles.extend(table.iter().filter(|e| e.topics.is_empty()).map(|e| e.principle.to_string()));
        }

        if domain != Domain::Physics && mentions(&tokens, "temperature") {
            principles.push("Thermodynamics: temperature sets the energy available to a process".to_string());
        }
        if domain != Domain::Chemistry && mentions(&tokens, "rate") {
            principles.push("Kinetics: rates depend on the concentration of what is consumed".to_string());
        }

        principles
    }

    fn sources(&self, domain: Domain) -> Vec<String> {
        let source = match domain {
            Domain::Physics => "Halliday, Resnick and Walker, Fundamentals of Physics",
            Domain::Chemistry => "Atkins and de Paula, Physical Chemistry",
            Domain::Biology => "Urry et al., Campbell Biology",
            Domain::Environmental => "IPCC, Sixth Assessment Report",
            Domain::Engineering => "Callister, Materials Science and Engineering",
            Domain::Medicine => "Goodman and Gilman, The Pharmacological Basis of Therapeutics",
        };
        vec![source.to_string()]
    }
}

/// Knowledge base with nothing in it.
#[derive(Debug, Clone, Default)]
pub struct EmptyKnowledgeBase;

impl KnowledgeBase for EmptyKnowledgeBase {
    fn lookup(&self, _domain: Domain, _topic: &str) -> Vec<String> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_match() {
        let kb = StaticKnowledgeBase::new();
        let principles = kb.lookup(Domain::Chemistry, "How does temperature affect reaction rate?");
        assert!(principles.iter().any(|p| p.starts_with("Arrhenius")));
        assert!(!principles.iter().any(|p| p.starts_with("Collision")));
    }

    #[test]
    fn test_general_principles_when_no_topic_matches() {
        let kb = StaticKnowledgeBase::new();
        let principles = kb.lookup(Domain::Engineering, "what happens here");
        assert_eq!(principles, vec!["Factor of safety: design capacity must exceed the expected load"]);
    }

    #[test]
    fn test_cross_domain_additions() {
        let kb = StaticKnowledgeBase::new();
        let principles = kb.lookup(Domain::Biology, "growth rate at high temperature");
        assert!(principles.iter().any(|p| p.starts_with("Thermodynamics")));
        assert!(principles.iter().any(|p| p.starts_with("Kinetics")));

        let physics = kb.lookup(Domain::Physics, "temperature");
        assert!(!physics.iter().any(|p| p.starts_with("Thermodynamics")));
    }

    #[test]
    fn test_sources_and_empty_base() {
        assert_eq!(StaticKnowledgeBase.sources(Domain::Medicine).len(), 1);
        assert!(EmptyKnowledgeBase.lookup(Domain::Physics, "force").is_empty());
        assert!(EmptyKnowledgeBase.sources(Domain::Physics).is_empty());
    }
}
