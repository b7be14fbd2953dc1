//! Theoretical Agent Implementation
//!
//! # Purpose
//! Turn a classified question into a testable [`Hypothesis`] bound to a
//! candidate [`MathModel`].
//!
//! # Steps
//! 1. Look up domain principles in the knowledge base
//! 2. Select a model from the catalogue by topic rules
//! 3. Ask the language model for a hypothesis statement, bounded by timeout
//! 4. Parse the `HYPOTHESIS:` and `CONFIDENCE:` lines
//!
//! # Failure Modes
//! - Empty question: validation error
//! - Language-model error or timeout: `ModelGenerationFailed`
//! - Empty response: `ModelGenerationFailed`
//! - Catalogue template rejected by the model contract: `ModelGenerationFailed`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::catalog::ModelCatalog;
use super::traits::Agent;
use crate::clients::{generate_with_timeout, LanguageModel, LanguageModelError};
use crate::config::InvestigationConfig;
use crate::contracts::{
    AgentClassification, AgentIdentity, Classification, Domain, Hypothesis, MalformedModel, MathModel,
    PipelineStage, StageRecord,
};
use crate::knowledge::KnowledgeBase;

/// Agent version (semantic versioning).
pub const THEORETICAL_AGENT_VERSION: &str = "1.0.0";

/// Agent identifier.
pub const THEORETICAL_AGENT_ID: &str = "theoretical-agent-v1";

/// Longest statement kept when the response has no `HYPOTHESIS:` line.
const FALLBACK_STATEMENT_CHARS: usize = 200;

/// Why hypothesis generation failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationFailure {
    #[error(transparent)]
    LanguageModel(#[from] LanguageModelError),

    #[error("language model returned an empty response")]
    EmptyResponse,

    #[error(transparent)]
    MalformedModel(#[from] MalformedModel),
}

/// Errors from Theoretical Agent operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TheoreticalAgentError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Model generation failed: {0}")]
    ModelGenerationFailed(GenerationFailure),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<GenerationFailure> for TheoreticalAgentError {
    fn from(err: GenerationFailure) -> Self {
        TheoreticalAgentError::ModelGenerationFailed(err)
    }
}

impl From<LanguageModelError> for TheoreticalAgentError {
    fn from(err: LanguageModelError) -> Self {
        TheoreticalAgentError::ModelGenerationFailed(err.into())
    }
}

impl From<MalformedModel> for TheoreticalAgentError {
    fn from(err: MalformedModel) -> Self {
        TheoreticalAgentError::ModelGenerationFailed(err.into())
    }
}

/// Input to the theoretical stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TheoryRequest {
    pub question: String,
    pub classification: Classification,
}

/// Configuration for Theoretical Agent.
#[derive(Debug, Clone)]
pub struct TheoreticalAgentConfig {
    /// Bound on every language-model call
    pub timeout: Duration,

    /// Prior used when the response has no usable `CONFIDENCE:` line
    pub default_confidence_prior: f64,
}

impl Default for TheoreticalAgentConfig {
    fn default() -> Self {
        Self::from(&InvestigationConfig::default())
    }
}

impl From<&InvestigationConfig> for TheoreticalAgentConfig {
    fn from(config: &InvestigationConfig) -> Self {
        Self {
            timeout: config.llm_timeout(),
            default_confidence_prior: config.default_confidence_prior,
        }
    }
}

/// Statement and prior extracted from a model response.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedHypothesis {
    pub statement: String,
    pub confidence: f64,
}

/// Parse `HYPOTHESIS:` / `CONFIDENCE:` lines.
///
/// Without a `HYPOTHESIS:` line the first non-empty line becomes the
/// statement. A missing or unparsable confidence yields `default_prior`.
/// Returns `None` when the response has no text at all.
pub fn parse_hypothesis_response(text: &str, default_prior: f64) -> Option<ParsedHypothesis> {
    let tagged = text.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("HYPOTHESIS:")?;
        let statement = rest.split("CONFIDENCE:").next().unwrap_or(rest).trim();
        (!statement.is_empty()).then(|| statement.to_string())
    });

    let statement = match tagged {
        Some(statement) => statement,
        None => {
            let first = text.lines().map(str::trim).find(|line| !line.is_empty())?;
            first.chars().take(FALLBACK_STATEMENT_CHARS).collect()
        }
    };

    let confidence = text
        .find("CONFIDENCE:")
        .and_then(|at| {
            let rest = text[at + "CONFIDENCE:".len()..].trim_start();
            let end = rest
                .find(|c: char| !(c.is_ascii_digit() || c == '.'))
                .unwrap_or(rest.len());
            rest[..end].parse::<f64>().ok()
        })
        .filter(|c| c.is_finite())
        .map(|c| c.clamp(0.0, 1.0))
        .unwrap_or(default_prior);

    Some(ParsedHypothesis { statement, confidence })
}

/// Theoretical Agent for hypothesis generation.
#[derive(Clone)]
pub struct TheoreticalAgent {
    identity: AgentIdentity,
    config: TheoreticalAgentConfig,
    language_model: Arc<dyn LanguageModel>,
    knowledge: Arc<dyn KnowledgeBase>,
    catalog: ModelCatalog,
}

impl TheoreticalAgent {
    /// Create a new Theoretical Agent with default configuration.
    pub fn new(language_model: Arc<dyn LanguageModel>, knowledge: Arc<dyn KnowledgeBase>) -> Self {
        Self::with_config(TheoreticalAgentConfig::default(), language_model, knowledge)
    }

    /// Create a new Theoretical Agent with custom configuration.
    pub fn with_config(
        config: TheoreticalAgentConfig,
        language_model: Arc<dyn LanguageModel>,
        knowledge: Arc<dyn KnowledgeBase>,
    ) -> Self {
        Self {
            identity: AgentIdentity {
                id: THEORETICAL_AGENT_ID.to_string(),
                version: THEORETICAL_AGENT_VERSION.to_string(),
                classification: AgentClassification::HypothesisGeneration,
                description: "Forms testable hypotheses from domain principles and a candidate model".to_string(),
            },
            config,
            language_model,
            knowledge,
            catalog: ModelCatalog::new(),
        }
    }

    pub fn config(&self) -> &TheoreticalAgentConfig {
        &self.config
    }

    /// Validate and execute without producing a stage record.
    pub async fn generate_hypothesis(
        &self,
        question: &str,
        classification: &Classification,
    ) -> Result<Hypothesis, TheoreticalAgentError> {
        let request = TheoryRequest {
            question: question.to_string(),
            classification: classification.clone(),
        };
        self.validate_input(&request)?;
        self.execute(request).await
    }

    fn build_prompt(&self, question: &str, domain: Domain, model: &MathModel, principles: &[String]) -> String {
        let mut prompt = String::new();
        prompt.push_str("TASK: hypothesis\n");
        prompt.push_str(&format!("QUESTION: {}\n", question.trim()));
        prompt.push_str(&format!("DOMAIN: {}\n", domain));
        prompt.push_str(&format!("RELATIONSHIP: {}\n", model.equation()));
        prompt.push_str(&format!(
            "RANGE: {} from {} to {} {}\n",
            model.independent_variable().name,
            model.valid_range().min,
            model.valid_range().max,
            model.independent_variable().unit
        ));

        if !principles.is_empty() {
            prompt.push_str("\nEstablished principles:\n");
            for principle in principles {
                prompt.push_str(&format!("- {}\n", principle));
            }
        }

        let sources = self.knowledge.sources(domain);
        if !sources.is_empty() {
            prompt.push_str(&format!("Sources: {}\n", sources.join("; ")));
        }

        prompt.push_str(
            "\nWrite one testable hypothesis that answers the question using the relationship above.\n\
             Respond in exactly this format:\n\
             HYPOTHESIS: <clear, testable statement>\n\
             CONFIDENCE: <number from 0.0 to 1.0>\n",
        );
        prompt
    }
}

#[async_trait]
impl Agent for TheoreticalAgent {
    type Input = TheoryRequest;
    type Output = Hypothesis;
    type Error = TheoreticalAgentError;

    fn identity(&self) -> &AgentIdentity {
        &self.identity
    }

    fn stage(&self) -> PipelineStage {
        PipelineStage::Theory
    }

    fn validate_input(&self, input: &Self::Input) -> Result<(), Self::Error> {
        if input.question.trim().is_empty() {
            return Err(TheoreticalAgentError::Validation("question must not be empty".to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self, input), fields(agent_id = THEORETICAL_AGENT_ID, domain = %input.classification.domain))]
    async fn execute(&self, input: Self::Input) -> Result<Self::Output, Self::Error> {
        let domain = input.classification.domain;

        let principles = self.knowledge.lookup(domain, &input.question);
        debug!(principles = principles.len(), "Knowledge base consulted");

        let model = self.catalog.select(domain, &input.question)?;
        debug!(form = %model.form(), equation = %model.equation(), "Candidate model selected");

        let prompt = self.build_prompt(&input.question, domain, &model, &principles);
        let response = generate_with_timeout(self.language_model.as_ref(), &prompt, self.config.timeout).await?;

        let parsed = parse_hypothesis_response(&response, self.config.default_confidence_prior)
            .ok_or(GenerationFailure::EmptyResponse)?;

        info!(
            statement = %parsed.statement,
            confidence_prior = parsed.confidence,
            "Hypothesis generated"
        );

        Ok(Hypothesis {
            id: Uuid::new_v4(),
            statement: parsed.statement,
            domain,
            model,
            confidence_prior: parsed.confidence,
            principles,
        })
    }

    fn build_stage_record(
        &self,
        input: &Self::Input,
        output: &Self::Output,
        duration_ms: u64,
    ) -> Result<StageRecord, Self::Error> {
        let inputs_hash = StageRecord::compute_inputs_hash(input)
            .map_err(|e| TheoreticalAgentError::Internal(e.to_string()))?;
        let outputs = serde_json::to_value(output).map_err(|e| TheoreticalAgentError::Internal(e.to_string()))?;

        StageRecord::builder()
            .agent_id(THEORETICAL_AGENT_ID)
            .agent_version(THEORETICAL_AGENT_VERSION)
            .stage(PipelineStage::Theory)
            .inputs_hash(inputs_hash)
            .outputs(outputs)
            .confidence(output.confidence_prior)
            .duration_ms(duration_ms)
            .metadata(json!({
                "language_model": self.language_model.name(),
                "model_form": output.model.form().as_str(),
                "principles": output.principles.len(),
                "classification_confidence": input.classification.confidence,
            }))
            .build()
            .map_err(|e| TheoreticalAgentError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::DomainClassifier;
    use crate::clients::StaticLanguageModel;
    use crate::contracts::ModelForm;
    use crate::knowledge::StaticKnowledgeBase;

    const QUESTION: &str = "How does temperature affect chemical reaction rate?";

    fn agent(reply: &str) -> TheoreticalAgent {
        TheoreticalAgent::new(
            Arc::new(StaticLanguageModel::new(reply)),
            Arc::new(StaticKnowledgeBase::new()),
        )
    }

    #[test]
    fn test_parse_tagged_response() {
        let parsed = parse_hypothesis_response(
            "Some preamble\nHYPOTHESIS: Rate rises exponentially with temperature\nCONFIDENCE: 0.85\n",
            0.7,
        )
        .unwrap();
        assert_eq!(parsed.statement, "Rate rises exponentially with temperature");
        assert_eq!(parsed.confidence, 0.85);
    }

    #[test]
    fn test_parse_same_line_and_fallbacks() {
        let parsed = parse_hypothesis_response("HYPOTHESIS: A holds CONFIDENCE: 0.4", 0.7).unwrap();
        assert_eq!(parsed.statement, "A holds");
        assert_eq!(parsed.confidence, 0.4);

        let parsed = parse_hypothesis_response("\n  Rate doubles every 10 K\nmore text", 0.7).unwrap();
        assert_eq!(parsed.statement, "Rate doubles every 10 K");
        assert_eq!(parsed.confidence, 0.7);

        let parsed = parse_hypothesis_response("HYPOTHESIS: x\nCONFIDENCE: high", 0.6).unwrap();
        assert_eq!(parsed.confidence, 0.6);

        let parsed = parse_hypothesis_response("HYPOTHESIS: x\nCONFIDENCE: 7", 0.6).unwrap();
        assert_eq!(parsed.confidence, 1.0);

        assert!(parse_hypothesis_response("   \n\n", 0.7).is_none());
    }

    #[tokio::test]
    async fn test_generate_hypothesis() {
        let classification = DomainClassifier::default().classify(QUESTION);
        let hypothesis = agent("HYPOTHESIS: Reaction rate follows the Arrhenius law\nCONFIDENCE: 0.8")
            .generate_hypothesis(QUESTION, &classification)
            .await
            .unwrap();

        assert_eq!(hypothesis.domain, Domain::Chemistry);
        assert_eq!(hypothesis.model.form(), ModelForm::Arrhenius);
        assert_eq!(hypothesis.statement, "Reaction rate follows the Arrhenius law");
        assert_eq!(hypothesis.confidence_prior, 0.8);
        assert!(hypothesis.principles.iter().any(|p| p.starts_with("Arrhenius")));
    }

    #[tokio::test]
    async fn test_empty_question_is_rejected() {
        let classification = DomainClassifier::default().classify("");
        let err = agent("HYPOTHESIS: x").generate_hypothesis("  ", &classification).await.unwrap_err();
        assert!(matches!(err, TheoreticalAgentError::Validation(_)));
    }

    #[tokio::test]
    async fn test_empty_response_fails_generation() {
        let classification = DomainClassifier::default().classify(QUESTION);
        let err = agent("").generate_hypothesis(QUESTION, &classification).await.unwrap_err();
        assert_eq!(err, TheoreticalAgentError::ModelGenerationFailed(GenerationFailure::EmptyResponse));
        assert!(err.to_string().starts_with("Model generation failed"));
    }

    #[tokio::test]
    async fn test_invoke_produces_stage_record() {
        let classification = DomainClassifier::default().classify(QUESTION);
        let request = TheoryRequest {
            question: QUESTION.to_string(),
            classification,
        };
        let (hypothesis, record) = agent("HYPOTHESIS: y\nCONFIDENCE: 0.9").invoke(request.clone()).await.unwrap();
        assert_eq!(record.stage, PipelineStage::Theory);
        assert_eq!(record.agent_id, THEORETICAL_AGENT_ID);
        assert_eq!(record.confidence, hypothesis.confidence_prior);
        assert_eq!(record.inputs_hash, StageRecord::compute_inputs_hash(&request).unwrap());
    }
}
