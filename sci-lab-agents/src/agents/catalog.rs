//! Model Catalogue
//!
//! Fixed rules that pick a candidate model for a question. Each domain has
//! an ordered list of topic rules and a default; the first rule whose topic
//! keywords appear in the question wins.

use crate::classifier::{mentions, tokenize};
use crate::contracts::{Domain, MalformedModel, MathModel, ModelForm, ValueRange, Variable};

/// Template for one candidate model.
#[derive(Debug, Clone, Copy)]
pub struct ModelTemplate {
    pub form: ModelForm,
    pub parameters: &'static [(&'static str, f64)],
    /// Name and unit of the swept variable
    pub independent: (&'static str, &'static str),
    /// Name and unit of the response
    pub dependent: (&'static str, &'static str),
    pub range: (f64, f64),
}

impl ModelTemplate {
    pub fn instantiate(&self) -> Result<MathModel, MalformedModel> {
        let range = ValueRange::new(self.range.0, self.range.1)?;
        MathModel::from_pairs(
            self.form,
            self.parameters,
            Variable::new(self.independent.0, self.independent.1),
            Variable::new(self.dependent.0, self.dependent.1),
            range,
        )
    }
}

struct TopicRule {
    domain: Domain,
    topics: &'static [&'static str],
    template: ModelTemplate,
}

const DAMPED_OSCILLATOR: ModelTemplate = ModelTemplate {
    form: ModelForm::DampedOscillation,
    parameters: &[("amplitude", 1.0), ("damping", 0.1), ("frequency", 0.5)],
    independent: ("time", "s"),
    dependent: ("displacement", "m"),
    range: (0.0, 10.0),
};

const THERMAL_ACTIVATION: ModelTemplate = ModelTemplate {
    form: ModelForm::Arrhenius,
    parameters: &[("pre_exponential", 100.0), ("activation_energy", 1000.0), ("gas_constant", 8.314)],
    independent: ("temperature", "K"),
    dependent: ("rate", "1/s"),
    range: (273.15, 373.15),
};

const NEWTONIAN: ModelTemplate = ModelTemplate {
    form: ModelForm::Linear,
    // a = F / m with m = 2 kg
    parameters: &[("slope", 0.5), ("intercept", 0.0)],
    independent: ("force", "N"),
    dependent: ("acceleration", "m/s^2"),
    range: (0.0, 50.0),
};

const PH_OPTIMUM: ModelTemplate = ModelTemplate {
    form: ModelForm::Gaussian,
    parameters: &[("amplitude", 1.0), ("optimum", 7.0), ("width", 1.5)],
    independent: ("ph", ""),
    dependent: ("relative_activity", ""),
    range: (1.0, 14.0),
};

const RATE_LAW: ModelTemplate = ModelTemplate {
    form: ModelForm::PowerLaw,
    parameters: &[("coefficient", 0.1), ("exponent", 1.5)],
    independent: ("concentration", "mol/L"),
    dependent: ("reaction_rate", "mol/(L*s)"),
    range: (0.1, 10.0),
};

const ARRHENIUS: ModelTemplate = ModelTemplate {
    form: ModelForm::Arrhenius,
    parameters: &[("pre_exponential", 1.0e6), ("activation_energy", 50_000.0), ("gas_constant", 8.314)],
    independent: ("temperature", "K"),
    dependent: ("reaction_rate", "1/s"),
    range: (280.0, 400.0),
};

const LIGHT_RESPONSE: ModelTemplate = ModelTemplate {
    form: ModelForm::MichaelisMenten,
    parameters: &[("vmax", 50.0), ("km", 200.0)],
    independent: ("light_intensity", "lux"),
    dependent: ("photosynthesis_rate", "umol/(m^2*s)"),
    range: (0.0, 2000.0),
};

const NUTRIENT_UPTAKE: ModelTemplate = ModelTemplate {
    form: ModelForm::MichaelisMenten,
    parameters: &[("vmax", 15.0), ("km", 1.0)],
    independent: ("nutrient_concentration", "mmol/L"),
    dependent: ("uptake_rate", "mmol/h"),
    range: (0.0, 10.0),
};

const LOGISTIC_GROWTH: ModelTemplate = ModelTemplate {
    form: ModelForm::Logistic,
    parameters: &[("carrying_capacity", 1000.0), ("initial_population", 50.0), ("growth_rate", 0.05)],
    independent: ("time", "h"),
    dependent: ("population", "individuals"),
    range: (0.0, 200.0),
};

const CO2_FORCING: ModelTemplate = ModelTemplate {
    form: ModelForm::Logarithmic,
    parameters: &[("sensitivity", 3.0), ("baseline", 350.0)],
    independent: ("co2_concentration", "ppm"),
    dependent: ("temperature_change", "K"),
    range: (350.0, 700.0),
};

const HUMIDITY_COMFORT: ModelTemplate = ModelTemplate {
    form: ModelForm::Gaussian,
    parameters: &[("amplitude", 100.0), ("optimum", 60.0), ("width", 7.071)],
    independent: ("relative_humidity", "%"),
    dependent: ("comfort_index", ""),
    range: (20.0, 100.0),
};

const EXPOSURE_RESPONSE: ModelTemplate = ModelTemplate {
    form: ModelForm::Saturation,
    parameters: &[("maximum", 100.0), ("scale", 150.0)],
    independent: ("air_quality_index", "AQI"),
    dependent: ("health_impact", "%"),
    range: (0.0, 500.0),
};

const ELASTIC_STRAIN: ModelTemplate = ModelTemplate {
    form: ModelForm::Linear,
    // strain = stress / E with E = 2 GPa
    parameters: &[("slope", 5.0e-4), ("intercept", 0.0)],
    independent: ("stress", "MPa"),
    dependent: ("strain", ""),
    range: (0.0, 250.0),
};

const EFFICIENCY_CURVE: ModelTemplate = ModelTemplate {
    form: ModelForm::Gaussian,
    parameters: &[("amplitude", 85.0), ("optimum", 300.0), ("width", 316.23)],
    independent: ("power", "W"),
    dependent: ("efficiency", "%"),
    range: (50.0, 600.0),
};

const ELIMINATION: ModelTemplate = ModelTemplate {
    form: ModelForm::ExponentialDecay,
    parameters: &[("initial", 100.0), ("decay_rate", 0.1)],
    independent: ("time", "h"),
    dependent: ("plasma_concentration", "mg/L"),
    range: (0.0, 24.0),
};

const DOSE_RESPONSE: ModelTemplate = ModelTemplate {
    form: ModelForm::Hill,
    parameters: &[("max_response", 100.0), ("ec50", 10.0), ("hill_coefficient", 2.0)],
    independent: ("dose", "mg"),
    dependent: ("response", "%"),
    range: (0.0, 40.0),
};

const RULES: &[TopicRule] = &[
    TopicRule {
        domain: Domain::Physics,
        topics: &["oscillation", "pendulum", "spring", "vibration"],
        template: DAMPED_OSCILLATOR,
    },
    TopicRule {
        domain: Domain::Physics,
        topics: &["temperature", "thermal", "heat"],
        template: THERMAL_ACTIVATION,
    },
    TopicRule {
        domain: Domain::Chemistry,
        topics: &["temperature", "thermal", "heat"],
        template: ARRHENIUS,
    },
    TopicRule {
        domain: Domain::Chemistry,
        topics: &["ph", "acidity"],
        template: PH_OPTIMUM,
    },
    TopicRule {
        domain: Domain::Chemistry,
        topics: &["concentration"],
        template: RATE_LAW,
    },
    TopicRule {
        domain: Domain::Biology,
        topics: &["light", "photosynthesis", "wavelength", "wavelengths"],
        template: LIGHT_RESPONSE,
    },
    TopicRule {
        domain: Domain::Biology,
        topics: &["nutrient", "nutrients", "substrate"],
        template: NUTRIENT_UPTAKE,
    },
    TopicRule {
        domain: Domain::Environmental,
        topics: &["co2", "carbon", "greenhouse", "climate"],
        template: CO2_FORCING,
    },
    TopicRule {
        domain: Domain::Environmental,
        topics: &["humidity"],
        template: HUMIDITY_COMFORT,
    },
    TopicRule {
        domain: Domain::Engineering,
        topics: &["stress", "strain", "material", "load", "beam"],
        template: ELASTIC_STRAIN,
    },
    TopicRule {
        domain: Domain::Medicine,
        topics: &["time", "pharmacokinetic", "pharmacokinetics", "plasma", "clearance", "elimination"],
        template: ELIMINATION,
    },
];

/// Template used when no topic rule matches.
pub fn default_template(domain: Domain) -> ModelTemplate {
    match domain {
        Domain::Physics => NEWTONIAN,
        Domain::Chemistry => ARRHENIUS,
        Domain::Biology => LOGISTIC_GROWTH,
        Domain::Environmental => EXPOSURE_RESPONSE,
        Domain::Engineering => EFFICIENCY_CURVE,
        Domain::Medicine => DOSE_RESPONSE,
    }
}

/// Rule-based model selection.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelCatalog;

impl ModelCatalog {
    pub fn new() -> Self {
        Self
    }

    /// Template chosen for `question` within `domain`.
    pub fn template_for(&self, domain: Domain, question: &str) -> ModelTemplate {
        let tokens = tokenize(question);
        RULES
            .iter()
            .filter(|rule| rule.domain == domain)
            .find(|rule| rule.topics.iter().any(|t| mentions(&tokens, t)))
            .map(|rule| rule.template)
            .unwrap_or_else(|| default_template(domain))
    }

    pub fn select(&self, domain: Domain, question: &str) -> Result<MathModel, MalformedModel> {
        self.template_for(domain, question).instantiate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chemistry_temperature_selects_arrhenius() {
        let model = ModelCatalog::new()
            .select(Domain::Chemistry, "How does temperature affect chemical reaction rate?")
            .unwrap();
        assert_eq!(model.form(), ModelForm::Arrhenius);
        assert_eq!(model.valid_range(), ValueRange { min: 280.0, max: 400.0 });
        assert_eq!(model.independent_variable().unit, "K");
    }

    #[test]
    fn test_topic_rules() {
        let catalog = ModelCatalog::new();
        assert_eq!(
            catalog.template_for(Domain::Physics, "How does a pendulum oscillation decay?").form,
            ModelForm::DampedOscillation
        );
        assert_eq!(
            catalog.template_for(Domain::Biology, "How does light intensity affect photosynthesis?").form,
            ModelForm::MichaelisMenten
        );
        assert_eq!(
            catalog.template_for(Domain::Medicine, "How does plasma level change over time?").form,
            ModelForm::ExponentialDecay
        );
        assert_eq!(
            catalog.template_for(Domain::Environmental, "What does CO2 do to the climate?").form,
            ModelForm::Logarithmic
        );
    }

    #[test]
    fn test_defaults() {
        let catalog = ModelCatalog::new();
        assert_eq!(catalog.template_for(Domain::Physics, "what happens").form, ModelForm::Linear);
        assert_eq!(catalog.template_for(Domain::Medicine, "what dose").form, ModelForm::Hill);
    }

    #[test]
    fn test_every_template_instantiates() {
        for rule in RULES {
            assert!(rule.template.instantiate().is_ok(), "{:?}", rule.template.form);
        }
        for domain in Domain::ALL {
            let model = default_template(domain).instantiate().unwrap();
            let range = model.valid_range();
            assert!(model.evaluate(range.min).is_finite());
            assert!(model.evaluate(range.max).is_finite());
        }
    }
}
