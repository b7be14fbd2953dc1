//! Collector Agent Implementation
//!
//! Reconciles a hypothesis with its experiment and issues the final
//! [`Conclusion`].
//!
//! # Verdict rules
//! - supported: fit is strong or moderate and confidence >= 0.6
//! - refuted: fit is none and confidence < 0.3
//! - inconclusive: anything else
//!
//! Both thresholds come from [`VerdictThresholds`]. The conclusion carries
//! the analysis confidence unchanged.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument};

use super::traits::Agent;
use crate::clients::{generate_with_timeout, LanguageModel, LanguageModelError};
use crate::config::{InvestigationConfig, VerdictThresholds};
use crate::contracts::{
    AgentClassification, AgentIdentity, Conclusion, Domain, ExperimentResult, FitQuality, Hypothesis,
    PipelineStage, StageRecord, Verdict,
};

/// Agent version (semantic versioning).
pub const COLLECTOR_AGENT_VERSION: &str = "1.0.0";

/// Agent identifier.
pub const COLLECTOR_AGENT_ID: &str = "collector-agent-v1";

/// Upper bound on recommendations in a conclusion.
pub const MAX_RECOMMENDATIONS: usize = 6;

/// Errors from Collector Agent operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CollectorAgentError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Narrative generation failed: {0}")]
    Narrative(#[from] LanguageModelError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Input to the collection stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionRequest {
    pub hypothesis: Hypothesis,
    pub result: ExperimentResult,
}

/// Configuration for Collector Agent.
#[derive(Debug, Clone)]
pub struct CollectorAgentConfig {
    pub thresholds: VerdictThresholds,

    /// Ask the language model for a discussion paragraph
    pub narrative: bool,

    /// Bound on the narrative call
    pub timeout: Duration,
}

impl Default for CollectorAgentConfig {
    fn default() -> Self {
        Self::from(&InvestigationConfig::default())
    }
}

impl From<&InvestigationConfig> for CollectorAgentConfig {
    fn from(config: &InvestigationConfig) -> Self {
        Self {
            thresholds: config.verdict_thresholds,
            narrative: config.narrative,
            timeout: config.llm_timeout(),
        }
    }
}

/// Decide the verdict for a fit bucket and confidence.
pub fn decide_verdict(fit: FitQuality, confidence: f64, thresholds: &VerdictThresholds) -> Verdict {
    match fit {
        FitQuality::Strong | FitQuality::Moderate if confidence >= thresholds.supported => Verdict::Supported,
        FitQuality::None if confidence < thresholds.refuted => Verdict::Refuted,
        _ => Verdict::Inconclusive,
    }
}

fn domain_research(domain: Domain) -> &'static [&'static str] {
    match domain {
        Domain::Physics => &[
            "Investigate quantum effects at microscopic scales",
            "Examine relativistic corrections for high-speed phenomena",
            "Study non-linear dynamics and chaotic regimes",
            "Explore temperature-dependent material properties",
        ],
        Domain::Chemistry => &[
            "Investigate catalyst effects on reaction pathways",
            "Study solvent effects on reaction kinetics",
            "Examine pressure dependence of equilibrium constants",
            "Explore green chemistry alternatives",
        ],
        Domain::Biology => &[
            "Study genetic variations affecting the observed response",
            "Investigate seasonal and circadian rhythm effects",
            "Examine inter-species variations and evolutionary implications",
            "Explore molecular mechanisms underlying the observed response",
        ],
        Domain::Environmental => &[
            "Scale up to ecosystem-level impacts",
            "Study long-term temporal trends and climate interactions",
            "Investigate the influence of human activity",
            "Examine geographical variations and local factors",
        ],
        Domain::Engineering => &[
            "Test performance across a wider operating envelope",
            "Quantify manufacturing tolerances and their effect on the response",
            "Study fatigue and degradation under cyclic loading",
            "Validate the model against full-scale prototype measurements",
        ],
        Domain::Medicine => &[
            "Run a dose-ranging study in a more diverse patient population",
            "Investigate inter-patient variability in absorption and clearance",
            "Examine drug interactions that may shift the response",
            "Follow long-term outcomes and adverse events",
        ],
    }
}

fn verdict_followups(verdict: Verdict) -> [&'static str; 2] {
    match verdict {
        Verdict::Supported => [
            "Replicate the experiment with independent seeds and measurement setups",
            "Extend the sweep beyond the tested range to probe the limits of the model",
        ],
        Verdict::Refuted => [
            "Revisit the theoretical assumptions behind the model",
            "Test alternative functional forms against the same data",
        ],
        Verdict::Inconclusive => [
            "Increase the sample count to reduce statistical uncertainty",
            "Reduce measurement noise or control additional variables",
        ],
    }
}

/// Verdict follow-ups first, then domain research directions, capped.
pub fn recommendations(domain: Domain, verdict: Verdict) -> Vec<String> {
    verdict_followups(verdict)
        .iter()
        .chain(domain_research(domain))
        .take(MAX_RECOMMENDATIONS)
        .map(|r| r.to_string())
        .collect()
}

fn strength(confidence: f64) -> (&'static str, &'static str) {
    if confidence > 0.8 {
        ("strongly", "high")
    } else if confidence > 0.6 {
        ("moderately", "moderate")
    } else {
        ("weakly", "low")
    }
}

/// One-paragraph summary of the outcome.
pub fn summarize(hypothesis: &Hypothesis, result: &ExperimentResult, verdict: Verdict) -> String {
    let analysis = &result.analysis;
    let confidence = analysis.confidence_score;
    let (adverb, level) = strength(confidence);
    let context = hypothesis.domain.theoretical_context();

    match verdict {
        Verdict::Supported => format!(
            "The experimental evidence {} supports the hypothesis \"{}\" with {} confidence ({:.2}). \
             The results are consistent with established {}. The model {} agrees with the simulated \
             data (r = {:.3}, {} fit over {} samples).",
            adverb,
            hypothesis.statement,
            level,
            confidence,
            context,
            hypothesis.equation(),
            analysis.correlation,
            analysis.fit_quality,
            analysis.sample_count
        ),
        Verdict::Refuted => format!(
            "The experimental evidence contradicts the hypothesis \"{}\" (r = {:.3}, {} fit, confidence {:.2}). \
             Although {} suggested this relationship, the simulated data do not follow the model {}.",
            hypothesis.statement,
            analysis.correlation,
            analysis.fit_quality,
            confidence,
            context,
            hypothesis.equation()
        ),
        Verdict::Inconclusive => format!(
            "The experimental evidence neither confirms nor refutes the hypothesis \"{}\" \
             (r = {:.3}, {} fit, {} confidence {:.2}). The model {} may need refinement, or \
             variables outside the model may be at work.",
            hypothesis.statement,
            analysis.correlation,
            analysis.fit_quality,
            level,
            confidence,
            hypothesis.equation()
        ),
    }
}

/// Collector Agent for evidence synthesis.
#[derive(Clone)]
pub struct CollectorAgent {
    identity: AgentIdentity,
    config: CollectorAgentConfig,
    language_model: Option<Arc<dyn LanguageModel>>,
}

impl CollectorAgent {
    /// Create a Collector Agent that writes no narrative.
    pub fn new() -> Self {
        Self::with_config(
            CollectorAgentConfig {
                narrative: false,
                ..Default::default()
            },
            None,
        )
    }

    /// Create a Collector Agent with custom configuration.
    ///
    /// The narrative step runs only when enabled and a model is supplied.
    pub fn with_config(config: CollectorAgentConfig, language_model: Option<Arc<dyn LanguageModel>>) -> Self {
        Self {
            identity: AgentIdentity {
                id: COLLECTOR_AGENT_ID.to_string(),
                version: COLLECTOR_AGENT_VERSION.to_string(),
                classification: AgentClassification::EvidenceSynthesis,
                description: "Reconciles hypothesis and experiment into a verdict".to_string(),
            },
            config,
            language_model,
        }
    }

    pub fn config(&self) -> &CollectorAgentConfig {
        &self.config
    }

    /// Validate and execute without producing a stage record.
    pub async fn synthesize(
        &self,
        hypothesis: &Hypothesis,
        result: &ExperimentResult,
    ) -> Result<Conclusion, CollectorAgentError> {
        let request = CollectionRequest {
            hypothesis: hypothesis.clone(),
            result: result.clone(),
        };
        self.validate_input(&request)?;
        self.execute(request).await
    }

    fn discussion_prompt(request: &CollectionRequest, verdict: Verdict) -> String {
        let analysis = &request.result.analysis;
        format!(
            "TASK: discussion\n\
             STATEMENT: {}\n\
             DOMAIN: {}\n\
             RELATIONSHIP: {}\n\
             VERDICT: {}\n\
             CORRELATION: {:.4}\n\
             MEAN_ABSOLUTE_ERROR: {:.4}\n\
             FIT: {}\n\
             SAMPLES: {}\n\n\
             Compare the theoretical prediction with the simulated outcome in one paragraph. \
             Assess the strength of evidence and name the main limitation.\n",
            request.hypothesis.statement,
            request.hypothesis.domain,
            request.hypothesis.equation(),
            verdict,
            analysis.correlation,
            analysis.mean_absolute_error,
            analysis.fit_quality,
            analysis.sample_count
        )
    }
}

impl Default for CollectorAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for CollectorAgent {
    type Input = CollectionRequest;
    type Output = Conclusion;
    type Error = CollectorAgentError;

    fn identity(&self) -> &AgentIdentity {
        &self.identity
    }

    fn stage(&self) -> PipelineStage {
        PipelineStage::Collection
    }

    fn validate_input(&self, input: &Self::Input) -> Result<(), Self::Error> {
        if input.hypothesis.domain != input.result.design.domain {
            return Err(CollectorAgentError::Validation(format!(
                "hypothesis domain {} does not match experiment domain {}",
                input.hypothesis.domain, input.result.design.domain
            )));
        }
        if input.result.analysis.sample_count != input.result.observations.len() {
            return Err(CollectorAgentError::Validation(format!(
                "analysis covers {} samples but {} observations were recorded",
                input.result.analysis.sample_count,
                input.result.observations.len()
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, input), fields(agent_id = COLLECTOR_AGENT_ID, domain = %input.hypothesis.domain))]
    async fn execute(&self, input: Self::Input) -> Result<Self::Output, Self::Error> {
        let analysis = &input.result.analysis;
        let confidence = analysis.confidence_score;
        let verdict = decide_verdict(analysis.fit_quality, confidence, &self.config.thresholds);

        let summary = summarize(&input.hypothesis, &input.result, verdict);
        let recommendations = recommendations(input.hypothesis.domain, verdict);

        let discussion = match (&self.language_model, self.config.narrative) {
            (Some(model), true) => {
                let prompt = Self::discussion_prompt(&input, verdict);
                let text = generate_with_timeout(model.as_ref(), &prompt, self.config.timeout).await?;
                let text = text.trim();
                debug!(chars = text.len(), "Discussion generated");
                (!text.is_empty()).then(|| text.to_string())
            }
            _ => None,
        };

        info!(verdict = %verdict, confidence = confidence, "Conclusion reached");

        Ok(Conclusion::new(verdict, confidence, summary, recommendations, discussion))
    }

    fn build_stage_record(
        &self,
        input: &Self::Input,
        output: &Self::Output,
        duration_ms: u64,
    ) -> Result<StageRecord, Self::Error> {
        let inputs_hash = StageRecord::compute_inputs_hash(input)
            .map_err(|e| CollectorAgentError::Internal(e.to_string()))?;
        let outputs = serde_json::to_value(output).map_err(|e| CollectorAgentError::Internal(e.to_string()))?;

        StageRecord::builder()
            .agent_id(COLLECTOR_AGENT_ID)
            .agent_version(COLLECTOR_AGENT_VERSION)
            .stage(PipelineStage::Collection)
            .inputs_hash(inputs_hash)
            .outputs(outputs)
            .confidence(output.confidence())
            .duration_ms(duration_ms)
            .metadata(json!({
                "verdict": output.verdict().to_string(),
                "narrative": output.discussion().is_some(),
            }))
            .build()
            .map_err(|e| CollectorAgentError::Internal(e.to_string()))
    }
}
