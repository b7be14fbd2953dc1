//! Conclusion Contracts
//!
//! A [`Conclusion`] is only produced by the collector stage of a run that
//! has not failed, so its constructor is crate-private and it does not
//! implement `Deserialize`. Failed runs produce a [`FailureReport`] instead.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::stage_record::{PipelineStage, WorkflowStage};

/// Final judgement on a hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Supported,
    Refuted,
    Inconclusive,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Supported => "supported",
            Self::Refuted => "refuted",
            Self::Inconclusive => "inconclusive",
        })
    }
}

/// Reconciled outcome of a successful investigation.
#[derive(Debug, Clone, Serialize)]
pub struct Conclusion {
    verdict: Verdict,
    confidence: f64,
    summary: String,
    recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    discussion: Option<String>,
}

impl Conclusion {
    pub(crate) fn new(
        verdict: Verdict,
        confidence: f64,
        summary: String,
        recommendations: Vec<String>,
        discussion: Option<String>,
    ) -> Self {
        Self {
            verdict,
            confidence: confidence.clamp(0.0, 1.0),
            summary,
            recommendations,
            discussion,
        }
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn recommendations(&self) -> &[String] {
        &self.recommendations
    }

    /// Narrative comparison of theory and experiment, when generated.
    pub fn discussion(&self) -> Option<&str> {
        self.discussion.as_deref()
    }
}

/// Error report emitted in place of a conclusion when a stage fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureReport {
    pub question: String,
    pub failed_stage: PipelineStage,
    pub last_completed: WorkflowStage,
    pub cause: String,
    pub recommendations: Vec<String>,
}
