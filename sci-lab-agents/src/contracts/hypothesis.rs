//! Hypothesis Contract
//!
//! Output of the theoretical stage: a testable statement bound to a model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::domain::Domain;
use super::model::MathModel;

/// A testable hypothesis produced by the theoretical agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hypothesis {
    /// Unique hypothesis identifier
    pub id: Uuid,

    /// Natural-language statement
    pub statement: String,

    /// Domain the hypothesis belongs to
    pub domain: Domain,

    /// Model used to generate predictions
    pub model: MathModel,

    /// Prior confidence in the statement, in [0, 1]
    pub confidence_prior: f64,

    /// Principles consulted while forming the hypothesis
    #[serde(default)]
    pub principles: Vec<String>,
}

impl Hypothesis {
    /// Mathematical relationship as a readable equation.
    pub fn equation(&self) -> String {
        self.model.equation()
    }
}
