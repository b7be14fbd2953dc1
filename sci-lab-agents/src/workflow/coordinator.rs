//! Workflow Coordinator
//!
//! Runs classify, theory, experiment and collection strictly in sequence.
//! Each stage is entered at most once and never retried; the first failure
//! moves the run to `failed` and is returned as a [`WorkflowError`] that
//! carries the stage, the cause and the final [`WorkflowState`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::state::{TransitionError, WorkflowState};
use crate::agents::{
    Agent, AgentTelemetry, CollectionRequest, CollectorAgent, CollectorAgentConfig, CollectorAgentError,
    ExperimentOverrides, ExperimentalAgent, ExperimentalAgentConfig, ExperimentalAgentError, GenerationFailure,
    TheoreticalAgent, TheoreticalAgentConfig, TheoreticalAgentError, TheoryRequest,
};
use crate::classifier::DomainClassifier;
use crate::clients::{LanguageModel, LanguageModelError};
use crate::config::InvestigationConfig;
use crate::contracts::{
    Classification, Conclusion, ExperimentResult, FailureReport, Hypothesis, PipelineStage, StageRecord,
};
use crate::knowledge::KnowledgeBase;
use crate::statistics::StatisticalAnalyzer;

const COORDINATOR_ID: &str = "workflow-coordinator";

/// Cause of a stage failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StageError {
    #[error(transparent)]
    Theory(#[from] TheoreticalAgentError),

    #[error(transparent)]
    Experiment(#[from] ExperimentalAgentError),

    #[error(transparent)]
    Collection(#[from] CollectorAgentError),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl StageError {
    fn language_model_error(&self) -> Option<&LanguageModelError> {
        match self {
            StageError::Theory(TheoreticalAgentError::ModelGenerationFailed(GenerationFailure::LanguageModel(e))) => {
                Some(e)
            }
            StageError::Collection(CollectorAgentError::Narrative(e)) => Some(e),
            _ => None,
        }
    }
}

/// A run that stopped before reaching a conclusion.
#[derive(Debug, Error)]
#[error("Investigation failed during the {stage} stage: {cause}")]
pub struct WorkflowError {
    pub stage: PipelineStage,
    #[source]
    pub cause: StageError,
    pub state: Box<WorkflowState>,
}

impl WorkflowError {
    /// Report emitted in place of a conclusion.
    pub fn failure_report(&self) -> FailureReport {
        FailureReport {
            question: self.state.question().to_string(),
            failed_stage: self.stage,
            last_completed: self.state.last_completed(),
            cause: self.cause.to_string(),
            recommendations: self.recommendations(),
        }
    }

    fn recommendations(&self) -> Vec<String> {
        let mut recs = Vec::new();
        if let Some(err) = self.cause.language_model_error() {
            recs.push(match err {
                LanguageModelError::Timeout(_) => {
                    "Raise SCI_LAB_LLM_TIMEOUT_SECS or retry when the language model is less loaded"
                }
                LanguageModelError::RateLimited(_) => "Wait for the rate limit to reset before retrying",
                LanguageModelError::Auth(_) => "Check that GOOGLE_API_KEY is set and valid, or run with --offline",
                LanguageModelError::Unknown(_) => "Check connectivity to the language model service",
            });
        }
        recs.push(match self.stage {
            PipelineStage::Theory => "Rephrase the question with domain-specific terms",
            PipelineStage::Experiment => "Check the sample count, range and noise level of the experiment design",
            PipelineStage::Collection => "Retry with narrative generation disabled (SCI_LAB_NARRATIVE=false)",
        });
        recs.into_iter().map(String::from).collect()
    }
}

/// Everything produced by a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct InvestigationReport {
    pub run_id: Uuid,
    pub question: String,
    pub classification: Classification,
    pub hypothesis: Hypothesis,
    pub experiment: ExperimentResult,
    pub conclusion: Conclusion,
    /// One record per stage, in execution order
    pub records: Vec<StageRecord>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Sequences the agents of one investigation.
#[derive(Clone)]
pub struct WorkflowCoordinator {
    classifier: DomainClassifier,
    theoretical: TheoreticalAgent,
    experimental: ExperimentalAgent,
    collector: CollectorAgent,
    telemetry_enabled: bool,
}

impl WorkflowCoordinator {
    /// Build every agent from one configuration.
    pub fn new(
        config: &InvestigationConfig,
        language_model: Arc<dyn LanguageModel>,
        knowledge: Arc<dyn KnowledgeBase>,
    ) -> Self {
        Self::from_agents(
            DomainClassifier::new(config.fallback_domain),
            TheoreticalAgent::with_config(TheoreticalAgentConfig::from(config), language_model.clone(), knowledge),
            ExperimentalAgent::with_config(
                ExperimentalAgentConfig::from(config),
                StatisticalAnalyzer::with_config(config),
            ),
            CollectorAgent::with_config(CollectorAgentConfig::from(config), Some(language_model)),
        )
    }

    pub fn from_agents(
        classifier: DomainClassifier,
        theoretical: TheoreticalAgent,
        experimental: ExperimentalAgent,
        collector: CollectorAgent,
    ) -> Self {
        Self {
            classifier,
            theoretical,
            experimental,
            collector,
            telemetry_enabled: true,
        }
    }

    /// Override sample count, noise or seed of the experiment stage.
    pub fn with_experiment_overrides(mut self, overrides: ExperimentOverrides) -> Self {
        self.experimental = self.experimental.with_overrides(overrides);
        self
    }

    pub fn without_telemetry(mut self) -> Self {
        self.telemetry_enabled = false;
        self
    }

    pub fn classifier(&self) -> &DomainClassifier {
        &self.classifier
    }

    fn telemetry(&self, agent_id: &str) -> AgentTelemetry {
        if self.telemetry_enabled {
            AgentTelemetry::new(agent_id)
        } else {
            AgentTelemetry::disabled(agent_id)
        }
    }

    /// Run the investigation and return only the conclusion.
    pub async fn investigate(&self, question: &str) -> Result<Conclusion, WorkflowError> {
        self.run(question).await.map(|report| report.conclusion)
    }

    /// Run the investigation and return the full report.
    #[instrument(skip(self, question), fields(question = %question))]
    pub async fn run(&self, question: &str) -> Result<InvestigationReport, WorkflowError> {
        let start = Instant::now();
        let mut state = WorkflowState::new(question);
        let run_id = state.run_id();
        let coordinator = self.telemetry(COORDINATOR_ID);

        let classification = self.classifier.classify(question);
        if let Some(ambiguity) = &classification.ambiguity {
            coordinator.warning(&ambiguity.to_string(), json!({ "run_id": run_id }));
        }
        info!(%run_id, domain = %classification.domain, confidence = classification.confidence, "Question classified");
        state.set_classification(classification.clone());

        // Theory
        let request = TheoryRequest {
            question: question.to_string(),
            classification: classification.clone(),
        };
        let hypothesis = match self.run_stage(&self.theoretical, request, run_id).await {
            Ok((hypothesis, record)) => {
                if let Err(e) = state.record_theory(hypothesis.clone(), record) {
                    return Err(Self::fail(state, PipelineStage::Theory, e.into()));
                }
                hypothesis
            }
            Err(cause) => return Err(Self::fail(state, PipelineStage::Theory, cause)),
        };
        coordinator.handoff(run_id, self.experimental.agent_id(), &hypothesis.statement);

        // Experiment
        let experiment = match self.run_stage(&self.experimental, hypothesis.clone(), run_id).await {
            Ok((experiment, record)) => {
                if let Err(e) = state.record_experiment(experiment.clone(), record) {
                    return Err(Self::fail(state, PipelineStage::Experiment, e.into()));
                }
                experiment
            }
            Err(cause) => return Err(Self::fail(state, PipelineStage::Experiment, cause)),
        };
        coordinator.handoff(
            run_id,
            self.collector.agent_id(),
            &format!("{} samples, {} fit", experiment.observations.len(), experiment.analysis.fit_quality),
        );

        // Collection
        let request = CollectionRequest {
            hypothesis: hypothesis.clone(),
            result: experiment.clone(),
        };
        let conclusion = match self.run_stage(&self.collector, request, run_id).await {
            Ok((conclusion, record)) => {
                if let Err(e) = state.record_conclusion(conclusion.clone(), record) {
                    return Err(Self::fail(state, PipelineStage::Collection, e.into()));
                }
                conclusion
            }
            Err(cause) => return Err(Self::fail(state, PipelineStage::Collection, cause)),
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            %run_id,
            verdict = %conclusion.verdict(),
            confidence = conclusion.confidence(),
            duration_ms = duration_ms,
            "Investigation complete"
        );

        Ok(InvestigationReport {
            run_id,
            question: question.to_string(),
            classification,
            hypothesis,
            experiment,
            conclusion,
            records: state.records().to_vec(),
            started_at: state.started_at(),
            completed_at: Utc::now(),
            duration_ms,
        })
    }

    async fn run_stage<A>(
        &self,
        agent: &A,
        input: A::Input,
        run_id: Uuid,
    ) -> Result<(A::Output, StageRecord), StageError>
    where
        A: Agent,
        StageError: From<A::Error>,
    {
        let telemetry = self.telemetry(agent.agent_id());
        telemetry.stage_started(run_id, json!({ "stage": agent.stage().to_string() }));

        match agent.invoke(input).await {
            Ok((output, record)) => {
                telemetry.stage_completed(
                    run_id,
                    record.duration_ms,
                    json!({ "record_id": record.id, "confidence": record.confidence }),
                );
                Ok((output, record))
            }
            Err(err) => {
                telemetry.stage_failed(run_id, &err.to_string());
                Err(err.into())
            }
        }
    }

    fn fail(mut state: WorkflowState, stage: PipelineStage, cause: StageError) -> WorkflowError {
        error!(run_id = %state.run_id(), stage = %stage, cause = %cause, "Investigation failed");
        // Only a terminal run rejects `fail`; stages never run after one.
        debug_assert!(!state.is_terminal(), "stage failure on a terminal run");
        if let Err(transition) = state.fail(stage, cause.to_string()) {
            error!(run_id = %state.run_id(), error = %transition, "Failure recorded on a terminal run");
        }
        WorkflowError {
            stage,
            cause,
            state: Box::new(state),
        }
    }
}
