//! Mathematical Model Contracts
//!
//! A [`MathModel`] is a closed-form function of one independent variable.
//! Every model carries its parameters, the variables it relates and the
//! range over which it is considered valid. Evaluation is pure: the same
//! model and input always produce the same output.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::fmt;
use thiserror::Error;

/// Error raised when a model cannot be instantiated from its parts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedModel {
    #[error("missing parameter '{parameter}' for {form} model")]
    MissingParameter { form: ModelForm, parameter: &'static str },

    #[error("parameter '{parameter}' must be finite, got {value}")]
    NonFiniteParameter { parameter: String, value: f64 },

    #[error("parameter '{parameter}' must be positive, got {value}")]
    NonPositiveParameter { parameter: &'static str, value: f64 },

    #[error("unexpected parameter '{parameter}' for {form} model")]
    UnexpectedParameter { form: ModelForm, parameter: String },

    #[error(transparent)]
    InvalidRange(#[from] InvalidRange),
}

/// Error raised for an empty, inverted or non-finite range.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid range [{min}, {max}]: min must be finite and strictly below max")]
pub struct InvalidRange {
    pub min: f64,
    pub max: f64,
}

/// Closed interval of the independent variable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    /// Build a range, rejecting `min >= max` and non-finite bounds.
    pub fn new(min: f64, max: f64) -> Result<Self, InvalidRange> {
        let range = Self { min, max };
        range.check()?;
        Ok(range)
    }

    /// Re-check a range that may have been deserialized or built literally.
    pub fn check(&self) -> Result<(), InvalidRange> {
        if self.min.is_finite() && self.max.is_finite() && self.min < self.max {
            Ok(())
        } else {
            Err(InvalidRange { min: self.min, max: self.max })
        }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn midpoint(&self) -> f64 {
        self.min + self.span() / 2.0
    }

    pub fn contains(&self, x: f64) -> bool {
        x >= self.min && x <= self.max
    }
}

/// A named physical quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub unit: String,
}

impl Variable {
    pub fn new(name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self { name: name.into(), unit: unit.into() }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unit.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{} ({})", self.name, self.unit)
        }
    }
}

/// Canonical closed-form relationships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelForm {
    /// `y = intercept + slope * x`
    Linear,
    /// `y = A * exp(-Ea / (R * x))`
    Arrhenius,
    /// `y = k * x^n`
    PowerLaw,
    /// `y = A * exp(-(x - mu)^2 / (2 * sigma^2))`
    Gaussian,
    /// `y = vmax * x / (km + x)`
    MichaelisMenten,
    /// `y = K / (1 + ((K - N0) / N0) * exp(-r * x))`
    Logistic,
    /// `y = C0 * exp(-k * x)`
    ExponentialDecay,
    /// `y = max * (1 - exp(-x / scale))`
    Saturation,
    /// `y = S * log2(x / baseline)`
    Logarithmic,
    /// `y = max * x^n / (ec50^n + x^n)`
    Hill,
    /// `y = A * exp(-gamma * x) * cos(2 * pi * f * x)`
    DampedOscillation,
}

impl ModelForm {
    /// Parameter names the form reads, in evaluation order.
    pub fn required_parameters(&self) -> &'static [&'static str] {
        match self {
            Self::Linear => &["slope", "intercept"],
            Self::Arrhenius => &["pre_exponential", "activation_energy", "gas_constant"],
            Self::PowerLaw => &["coefficient", "exponent"],
            Self::Gaussian => &["amplitude", "optimum", "width"],
            Self::MichaelisMenten => &["vmax", "km"],
            Self::Logistic => &["carrying_capacity", "initial_population", "growth_rate"],
            Self::ExponentialDecay => &["initial", "decay_rate"],
            Self::Saturation => &["maximum", "scale"],
            Self::Logarithmic => &["sensitivity", "baseline"],
            Self::Hill => &["max_response", "ec50", "hill_coefficient"],
            Self::DampedOscillation => &["amplitude", "damping", "frequency"],
        }
    }

    /// Parameters that appear as divisors or log arguments.
    fn strictly_positive_parameters(&self) -> &'static [&'static str] {
        match self {
            Self::Arrhenius => &["gas_constant"],
            Self::Gaussian => &["width"],
            Self::Logistic => &["carrying_capacity", "initial_population"],
            Self::Saturation => &["scale"],
            Self::Logarithmic => &["baseline"],
            Self::Hill => &["ec50"],
            _ => &[],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Arrhenius => "arrhenius",
            Self::PowerLaw => "power_law",
            Self::Gaussian => "gaussian",
            Self::MichaelisMenten => "michaelis_menten",
            Self::Logistic => "logistic",
            Self::ExponentialDecay => "exponential_decay",
            Self::Saturation => "saturation",
            Self::Logarithmic => "logarithmic",
            Self::Hill => "hill",
            Self::DampedOscillation => "damped_oscillation",
        }
    }
}

impl fmt::Display for ModelForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A closed-form model relating one independent variable to a response.
///
/// Deserialization goes through [`MathModel::new`], so a decoded model is
/// always complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MathModelParts")]
pub struct MathModel {
    form: ModelForm,
    parameters: BTreeMap<String, f64>,
    independent_variable: Variable,
    dependent_variable: Variable,
    valid_range: ValueRange,
}

/// Unchecked wire form of a [`MathModel`].
#[derive(Deserialize)]
struct MathModelParts {
    form: ModelForm,
    parameters: BTreeMap<String, f64>,
    independent_variable: Variable,
    dependent_variable: Variable,
    valid_range: ValueRange,
}

impl TryFrom<MathModelParts> for MathModel {
    type Error = MalformedModel;

    fn try_from(parts: MathModelParts) -> Result<Self, Self::Error> {
        Self::new(
            parts.form,
            parts.parameters,
            parts.independent_variable,
            parts.dependent_variable,
            parts.valid_range,
        )
    }
}

impl MathModel {
    /// Instantiate a model, checking parameters and range.
    pub fn new(
        form: ModelForm,
        parameters: BTreeMap<String, f64>,
        independent_variable: Variable,
        dependent_variable: Variable,
        valid_range: ValueRange,
    ) -> Result<Self, MalformedModel> {
        valid_range.check()?;

        for required in form.required_parameters() {
            if !parameters.contains_key(*required) {
                return Err(MalformedModel::MissingParameter { form, parameter: required });
            }
        }

        for (name, value) in &parameters {
            if !form.required_parameters().contains(&name.as_str()) {
                return Err(MalformedModel::UnexpectedParameter {
                    form,
                    parameter: name.clone(),
                });
            }
            if !value.is_finite() {
                return Err(MalformedModel::NonFiniteParameter {
                    parameter: name.clone(),
                    value: *value,
                });
            }
        }

        for positive in form.strictly_positive_parameters() {
            let value = parameters.get(*positive).copied().unwrap_or_default();
            if value <= 0.0 {
                return Err(MalformedModel::NonPositiveParameter { parameter: positive, value });
            }
        }

        Ok(Self {
            form,
            parameters,
            independent_variable,
            dependent_variable,
            valid_range,
        })
    }

    /// Convenience constructor from `(name, value)` pairs.
    pub fn from_pairs(
        form: ModelForm,
        pairs: &[(&str, f64)],
        independent_variable: Variable,
        dependent_variable: Variable,
        valid_range: ValueRange,
    ) -> Result<Self, MalformedModel> {
        let parameters = pairs
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect();
        Self::new(form, parameters, independent_variable, dependent_variable, valid_range)
    }

    pub fn form(&self) -> ModelForm {
        self.form
    }

    pub fn parameters(&self) -> &BTreeMap<String, f64> {
        &self.parameters
    }

    pub fn independent_variable(&self) -> &Variable {
        &self.independent_variable
    }

    pub fn dependent_variable(&self) -> &Variable {
        &self.dependent_variable
    }

    pub fn valid_range(&self) -> ValueRange {
        self.valid_range
    }

    fn p(&self, name: &str) -> f64 {
        // Presence is checked in `new`.
        self.parameters.get(name).copied().unwrap_or(f64::NAN)
    }

    /// Evaluate the model at `x`.
    pub fn evaluate(&self, x: f64) -> f64 {
        match self.form {
            ModelForm::Linear => self.p("intercept") + self.p("slope") * x,
            ModelForm::Arrhenius => {
                let a = self.p("pre_exponential");
                let ea = self.p("activation_energy");
                let r = self.p("gas_constant");
                a * (-ea / (r * x)).exp()
            }
            ModelForm::PowerLaw => self.p("coefficient") * x.powf(self.p("exponent")),
            ModelForm::Gaussian => {
                let sigma = self.p("width");
                let delta = x - self.p("optimum");
                self.p("amplitude") * (-(delta * delta) / (2.0 * sigma * sigma)).exp()
            }
            ModelForm::MichaelisMenten => self.p("vmax") * x / (self.p("km") + x),
            ModelForm::Logistic => {
                let k = self.p("carrying_capacity");
                let n0 = self.p("initial_population");
                let r = self.p("growth_rate");
                k / (1.0 + ((k - n0) / n0) * (-r * x).exp())
            }
            ModelForm::ExponentialDecay => self.p("initial") * (-self.p("decay_rate") * x).exp(),
            ModelForm::Saturation => self.p("maximum") * (1.0 - (-x / self.p("scale")).exp()),
            ModelForm::Logarithmic => self.p("sensitivity") * (x / self.p("baseline")).log2(),
            ModelForm::Hill => {
                let n = self.p("hill_coefficient");
                let xn = x.powf(n);
                self.p("max_response") * xn / (self.p("ec50").powf(n) + xn)
            }
            ModelForm::DampedOscillation => {
                let envelope = self.p("amplitude") * (-self.p("damping") * x).exp();
                envelope * (2.0 * PI * self.p("frequency") * x).cos()
            }
        }
    }

    /// Human-readable equation with parameter values substituted.
    pub fn equation(&self) -> String {
        let y = &self.dependent_variable.name;
        let x = &self.independent_variable.name;
        let p = |name: &str| format_number(self.p(name));
        match self.form {
            ModelForm::Linear => format!("{y} = {} + {} * {x}", p("intercept"), p("slope")),
            ModelForm::Arrhenius => format!(
                "{y} = {} * exp(-{} / ({} * {x}))",
                p("pre_exponential"),
                p("activation_energy"),
                p("gas_constant")
            ),
            ModelForm::PowerLaw => format!("{y} = {} * {x}^{}", p("coefficient"), p("exponent")),
            ModelForm::Gaussian => format!(
                "{y} = {} * exp(-({x} - {})^2 / (2 * {}^2))",
                p("amplitude"),
                p("optimum"),
                p("width")
            ),
            ModelForm::MichaelisMenten => format!("{y} = {} * {x} / ({} + {x})", p("vmax"), p("km")),
            ModelForm::Logistic => format!(
                "{y} = {K} / (1 + (({K} - {N0}) / {N0}) * exp(-{r} * {x}))",
                K = p("carrying_capacity"),
                N0 = p("initial_population"),
                r = p("growth_rate")
            ),
            ModelForm::ExponentialDecay => format!("{y} = {} * exp(-{} * {x})", p("initial"), p("decay_rate")),
            ModelForm::Saturation => format!("{y} = {} * (1 - exp(-{x} / {}))", p("maximum"), p("scale")),
            ModelForm::Logarithmic => format!("{y} = {} * log2({x} / {})", p("sensitivity"), p("baseline")),
            ModelForm::Hill => format!(
                "{y} = {max} * {x}^{n} / ({ec}^{n} + {x}^{n})",
                max = p("max_response"),
                ec = p("ec50"),
                n = p("hill_coefficient")
            ),
            ModelForm::DampedOscillation => format!(
                "{y} = {} * exp(-{} * {x}) * cos(2 * pi * {} * {x})",
                p("amplitude"),
                p("damping"),
                p("frequency")
            ),
        }
    }
}

fn format_number(value: f64) -> String {
    if value != 0.0 && (value.abs() >= 1e5 || value.abs() < 1e-3) {
        format!("{value:e}")
    } else {
        let text = format!("{value:.4}");
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}
