//! Domain Classifier
//!
//! Routes a free-text question to a [`Domain`] by weighted keyword overlap.
//! Single-word keywords match whole tokens; multi-word keywords match the
//! normalized token sequence. Ties go to the higher-priority domain in
//! [`Domain::ALL`] order. A question with no matching keyword falls back to
//! the configured domain with zero confidence.

use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::contracts::{Classification, ClassificationAmbiguous, Domain};

/// Keyword and weight.
type Keyword = (&'static str, f64);

const PHYSICS: &[Keyword] = &[
    ("force", 2.0),
    ("acceleration", 2.0),
    ("motion", 2.0),
    ("velocity", 2.0),
    ("momentum", 2.0),
    ("friction", 2.0),
    ("gravity", 2.0),
    ("pendulum", 2.0),
    ("oscillation", 2.0),
    ("spring", 1.5),
    ("electromagnetic", 2.0),
    ("magnetic", 1.5),
    ("quantum", 2.0),
    ("voltage", 1.5),
    ("wave", 1.0),
    ("energy", 1.0),
    ("pressure", 1.0),
    ("temperature", 1.0),
    ("heat", 1.0),
    ("thermal", 1.0),
    ("mass", 1.0),
];

const CHEMISTRY: &[Keyword] = &[
    ("reaction", 2.0),
    ("chemical", 2.0),
    ("molecule", 2.0),
    ("catalyst", 2.0),
    ("ph", 2.0),
    ("acid", 2.0),
    ("kinetics", 2.0),
    ("solubility", 2.0),
    ("concentration", 1.5),
    ("compound", 1.5),
    ("activation energy", 1.5),
    ("reaction rate", 1.0),
    ("equilibrium", 1.0),
    ("element", 1.0),
    ("bond", 1.0),
    ("rate", 1.0),
];

const BIOLOGY: &[Keyword] = &[
    ("plant", 2.0),
    ("plants", 2.0),
    ("animal", 2.0),
    ("cell", 2.0),
    ("organism", 2.0),
    ("species", 2.0),
    ("gene", 2.0),
    ("evolution", 2.0),
    ("photosynthesis", 2.0),
    ("bacteria", 2.0),
    ("population", 1.5),
    ("growth", 1.5),
    ("protein", 1.5),
    ("enzyme", 1.5),
    ("nutrient", 1.0),
    ("ecosystem", 1.0),
];

const ENVIRONMENTAL: &[Keyword] = &[
    ("climate", 2.0),
    ("pollution", 2.0),
    ("greenhouse", 2.0),
    ("emission", 2.0),
    ("emissions", 2.0),
    ("co2", 2.0),
    ("sustainability", 2.0),
    ("deforestation", 2.0),
    ("water quality", 2.0),
    ("air quality", 2.0),
    ("humidity", 1.5),
    ("carbon", 1.5),
    ("ecosystem", 1.0),
    ("warming", 1.0),
];

const ENGINEERING: &[Keyword] = &[
    ("efficiency", 2.0),
    ("turbine", 2.0),
    ("material", 1.5),
    ("structure", 1.5),
    ("stress", 1.5),
    ("strain", 1.5),
    ("optimization", 1.5),
    ("beam", 1.5),
    ("design", 1.0),
    ("performance", 1.0),
    ("load", 1.0),
    ("power", 1.0),
];

const MEDICINE: &[Keyword] = &[
    ("disease", 2.0),
    ("treatment", 2.0),
    ("drug", 2.0),
    ("dose", 2.0),
    ("dosage", 2.0),
    ("symptom", 2.0),
    ("therapy", 2.0),
    ("diagnosis", 2.0),
    ("patient", 2.0),
    ("clinical", 2.0),
    ("plasma", 1.5),
    ("health", 1.5),
];

fn keywords(domain: Domain) -> &'static [Keyword] {
    match domain {
        Domain::Physics => PHYSICS,
        Domain::Chemistry => CHEMISTRY,
        Domain::Biology => BIOLOGY,
        Domain::Environmental => ENVIRONMENTAL,
        Domain::Engineering => ENGINEERING,
        Domain::Medicine => MEDICINE,
    }
}

/// Lowercase alphanumeric tokens of `text`.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// True if `keyword` occurs in the token stream (whole tokens only).
pub(crate) fn mentions(tokens: &[String], keyword: &str) -> bool {
    let parts: Vec<&str> = keyword.split(' ').collect();
    if parts.len() == 1 {
        return tokens.iter().any(|t| t == keyword);
    }
    tokens
        .windows(parts.len())
        .any(|w| w.iter().zip(&parts).all(|(t, p)| t == p))
}

/// Keyword-overlap classifier. Pure and deterministic.
#[derive(Debug, Clone)]
pub struct DomainClassifier {
    fallback: Domain,
}

impl DomainClassifier {
    pub fn new(fallback: Domain) -> Self {
        Self { fallback }
    }

    pub fn fallback(&self) -> Domain {
        self.fallback
    }

    /// Score every domain; zero-score domains are omitted.
    pub fn scores(&self, question: &str) -> BTreeMap<Domain, f64> {
        let tokens = tokenize(question);
        let mut scores = BTreeMap::new();
        for domain in Domain::ALL {
            let score: f64 = keywords(domain)
                .iter()
                .filter(|(kw, _)| mentions(&tokens, kw))
                .map(|(_, weight)| weight)
                .sum();
            if score > 0.0 {
                scores.insert(domain, score);
            }
        }
        scores
    }

    /// Classify `question`.
    pub fn classify(&self, question: &str) -> Classification {
        let scores = self.scores(question);
        let total: f64 = scores.values().sum();

        let best = scores.values().copied().fold(0.0_f64, f64::max);
        if best <= 0.0 {
            let ambiguity = ClassificationAmbiguous::NoKeywordMatch { fallback: self.fallback };
            warn!(fallback = %self.fallback, "No domain keywords matched");
            return Classification {
                domain: self.fallback,
                confidence: 0.0,
                scores,
                ambiguity: Some(ambiguity),
            };
        }

        // Domain::ALL order is priority order, so the first top scorer wins.
        let tied: Vec<Domain> = Domain::ALL
            .iter()
            .copied()
            .filter(|d| scores.get(d).copied() == Some(best))
            .collect();
        let domain = tied[0];

        let ambiguity = if tied.len() > 1 {
            let others = tied[1..].to_vec();
            warn!(chosen = %domain, others = ?others, "Domain scores tied");
            Some(ClassificationAmbiguous::Tie { chosen: domain, others })
        } else {
            None
        };

        let confidence = (best / total).clamp(0.0, 1.0);
        debug!(domain = %domain, confidence = confidence, "Question classified");

        Classification { domain, confidence, scores, ambiguity }
    }
}

impl Default for DomainClassifier {
    fn default() -> Self {
        Self::new(Domain::Physics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chemistry_question() {
        let c = DomainClassifier::default().classify("How does temperature affect chemical reaction rate?");
        assert_eq!(c.domain, Domain::Chemistry);
        assert!(c.confidence > 0.5);
        assert!(!c.is_ambiguous());
    }

    #[test]
    fn test_reaction_rate_without_chemical() {
        let c = DomainClassifier::default().classify("How does temperature affect reaction rate?");
        assert_eq!(c.domain, Domain::Chemistry);
    }

    #[test]
    fn test_other_domains() {
        let classifier = DomainClassifier::default();
        assert_eq!(classifier.classify("How does force affect acceleration?").domain, Domain::Physics);
        assert_eq!(
            classifier.classify("How do different light wavelengths affect plant photosynthesis?").domain,
            Domain::Biology
        );
        assert_eq!(
            classifier.classify("How does CO2 concentration affect climate warming?").domain,
            Domain::Environmental
        );
        assert_eq!(
            classifier.classify("How does turbine load affect efficiency?").domain,
            Domain::Engineering
        );
        assert_eq!(
            classifier.classify("What drug dose gives the best treatment response?").domain,
            Domain::Medicine
        );
    }

    #[test]
    fn test_no_match_falls_back() {
        let c = DomainClassifier::new(Domain::Engineering).classify("Why is the sky blue?");
        assert_eq!(c.domain, Domain::Engineering);
        assert_eq!(c.confidence, 0.0);
        assert!(matches!(c.ambiguity, Some(ClassificationAmbiguous::NoKeywordMatch { .. })));
    }

    #[test]
    fn test_tie_breaks_by_priority() {
        // "energy" (physics, 1.0) against "design" (engineering, 1.0)
        let c = DomainClassifier::default().classify("energy design");
        assert_eq!(c.domain, Domain::Physics);
        assert!(matches!(
            c.ambiguity,
            Some(ClassificationAmbiguous::Tie { chosen: Domain::Physics, ref others }) if others == &vec![Domain::Engineering]
        ));
        assert!((c.confidence - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_whole_token_matching() {
        // "cellular" must not match "cell", "phone" must not match "ph"
        let scores = DomainClassifier::default().scores("cellular phone");
        assert!(scores.is_empty());
        assert!(mentions(&tokenize("Air quality index"), "air quality"));
    }
}
