//! Classification Contract

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use super::domain::Domain;

/// Non-fatal signal that the classifier could not pick a domain cleanly.
///
/// Carried inside a [`Classification`] rather than returned as an error:
/// the pipeline proceeds with the chosen domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ClassificationAmbiguous {
    #[error("no domain keywords matched; fell back to {fallback}")]
    NoKeywordMatch { fallback: Domain },

    #[error("domains tied on score; chose {chosen} by priority over {others:?}")]
    Tie { chosen: Domain, others: Vec<Domain> },
}

/// Result of routing a question to a domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Selected domain
    pub domain: Domain,

    /// Share of the total keyword score held by the selected domain
    pub confidence: f64,

    /// Keyword score per domain; absent entries scored zero
    pub scores: BTreeMap<Domain, f64>,

    /// Set when the choice was a fallback or a tie-break
    pub ambiguity: Option<ClassificationAmbiguous>,
}

impl Classification {
    pub fn is_ambiguous(&self) -> bool {
        self.ambiguity.is_some()
    }
}
