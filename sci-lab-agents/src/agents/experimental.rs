//! Experimental Agent Implementation
//!
//! Designs a simulated experiment for a hypothesis, runs it through the
//! [`SimulationEngine`] and compares the data with the hypothesis model
//! using the [`StatisticalAnalyzer`].
//!
//! The design sweeps the model's valid range with the per-domain sample
//! count and noise level; both can be overridden per agent. Simulation and
//! analysis errors are passed through unchanged.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

use super::traits::Agent;
use crate::config::{DomainTable, InvestigationConfig, DEFAULT_SEED};
use crate::contracts::{
    AgentClassification, AgentIdentity, ExperimentDesign, ExperimentResult, Hypothesis, PipelineStage,
    StageRecord,
};
use crate::simulation::{SimulationEngine, SimulationError};
use crate::statistics::{AnalysisError, StatisticalAnalyzer};

/// Agent version (semantic versioning).
pub const EXPERIMENTAL_AGENT_VERSION: &str = "1.0.0";

/// Agent identifier.
pub const EXPERIMENTAL_AGENT_ID: &str = "experimental-agent-v1";

/// Errors from Experimental Agent operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExperimentalAgentError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Simulation(#[from] SimulationError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Per-run overrides of the domain defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExperimentOverrides {
    pub sample_count: Option<usize>,
    pub noise_level: Option<f64>,
    pub seed: Option<u64>,
}

/// Configuration for Experimental Agent.
#[derive(Debug, Clone)]
pub struct ExperimentalAgentConfig {
    /// Per-domain sample count and noise level
    pub domains: DomainTable,

    /// Seed used when no override pins one
    pub seed: u64,

    pub overrides: ExperimentOverrides,
}

impl Default for ExperimentalAgentConfig {
    fn default() -> Self {
        Self {
            domains: DomainTable::default(),
            seed: DEFAULT_SEED,
            overrides: ExperimentOverrides::default(),
        }
    }
}

impl From<&InvestigationConfig> for ExperimentalAgentConfig {
    fn from(config: &InvestigationConfig) -> Self {
        Self {
            domains: config.domains,
            seed: config.seed,
            overrides: ExperimentOverrides::default(),
        }
    }
}

/// Experimental Agent for simulated experiments.
#[derive(Clone)]
pub struct ExperimentalAgent {
    identity: AgentIdentity,
    config: ExperimentalAgentConfig,
    engine: Arc<SimulationEngine>,
    analyzer: StatisticalAnalyzer,
}

impl ExperimentalAgent {
    /// Create a new Experimental Agent with default configuration.
    pub fn new() -> Self {
        Self::with_config(ExperimentalAgentConfig::default(), StatisticalAnalyzer::new())
    }

    /// Create a new Experimental Agent with custom configuration.
    pub fn with_config(config: ExperimentalAgentConfig, analyzer: StatisticalAnalyzer) -> Self {
        let engine = SimulationEngine::new().with_default_seed(config.seed);
        Self::with_engine(config, Arc::new(engine), analyzer)
    }

    /// Create an agent around an existing engine.
    pub fn with_engine(config: ExperimentalAgentConfig, engine: Arc<SimulationEngine>, analyzer: StatisticalAnalyzer) -> Self {
        Self {
            identity: AgentIdentity {
                id: EXPERIMENTAL_AGENT_ID.to_string(),
                version: EXPERIMENTAL_AGENT_VERSION.to_string(),
                classification: AgentClassification::ExperimentExecution,
                description: "Simulates experiments and compares the data with the hypothesis model".to_string(),
            },
            config,
            engine,
            analyzer,
        }
    }

    pub fn config(&self) -> &ExperimentalAgentConfig {
        &self.config
    }

    /// Replace the per-run overrides.
    pub fn with_overrides(mut self, overrides: ExperimentOverrides) -> Self {
        self.config.overrides = overrides;
        self
    }

    /// Experiment design for `hypothesis`, with the seed resolved.
    pub fn design_for(&self, hypothesis: &Hypothesis) -> ExperimentDesign {
        let defaults = self.config.domains.get(hypothesis.domain);
        let overrides = self.config.overrides;
        ExperimentDesign {
            id: Uuid::new_v4(),
            domain: hypothesis.domain,
            independent_variable: hypothesis.model.independent_variable().name.clone(),
            value_range: hypothesis.model.valid_range(),
            sample_count: overrides.sample_count.unwrap_or(defaults.sample_count),
            fixed_parameters: hypothesis.model.parameters().clone(),
            noise_level: overrides.noise_level.unwrap_or(defaults.noise_level),
            seed: Some(overrides.seed.unwrap_or(self.config.seed)),
        }
    }

    /// Validate and execute without producing a stage record.
    pub async fn run_experiment(&self, hypothesis: &Hypothesis) -> Result<ExperimentResult, ExperimentalAgentError> {
        self.validate_input(hypothesis)?;
        self.execute(hypothesis.clone()).await
    }
}

impl Default for ExperimentalAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for ExperimentalAgent {
    type Input = Hypothesis;
    type Output = ExperimentResult;
    type Error = ExperimentalAgentError;

    fn identity(&self) -> &AgentIdentity {
        &self.identity
    }

    fn stage(&self) -> PipelineStage {
        PipelineStage::Experiment
    }

    fn validate_input(&self, input: &Self::Input) -> Result<(), Self::Error> {
        if input.statement.trim().is_empty() {
            return Err(ExperimentalAgentError::Validation("hypothesis statement is empty".to_string()));
        }
        if !(0.0..=1.0).contains(&input.confidence_prior) {
            return Err(ExperimentalAgentError::Validation(format!(
                "confidence prior {} is outside [0, 1]",
                input.confidence_prior
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, input), fields(agent_id = EXPERIMENTAL_AGENT_ID, domain = %input.domain))]
    async fn execute(&self, input: Self::Input) -> Result<Self::Output, Self::Error> {
        let design = self.design_for(&input);
        let observations = self.engine.simulate(&design, &input.model, None)?;
        let analysis = self.analyzer.analyze(&observations, &input.model)?;

        info!(
            samples = observations.len(),
            correlation = analysis.correlation,
            fit = %analysis.fit_quality,
            confidence = analysis.confidence_score,
            "Experiment analysed"
        );

        Ok(ExperimentResult {
            design,
            observations,
            analysis,
        })
    }

    fn build_stage_record(
        &self,
        input: &Self::Input,
        output: &Self::Output,
        duration_ms: u64,
    ) -> Result<StageRecord, Self::Error> {
        let inputs_hash = StageRecord::compute_inputs_hash(input)
            .map_err(|e| ExperimentalAgentError::Internal(e.to_string()))?;
        let outputs = serde_json::to_value(output).map_err(|e| ExperimentalAgentError::Internal(e.to_string()))?;

        StageRecord::builder()
            .agent_id(EXPERIMENTAL_AGENT_ID)
            .agent_version(EXPERIMENTAL_AGENT_VERSION)
            .stage(PipelineStage::Experiment)
            .inputs_hash(inputs_hash)
            .outputs(outputs)
            .confidence(output.analysis.confidence_score)
            .duration_ms(duration_ms)
            .metadata(json!({
                "seed": output.design.seed,
                "sample_count": output.design.sample_count,
                "noise_level": output.design.noise_level,
                "fit_quality": output.analysis.fit_quality.as_str(),
            }))
            .build()
            .map_err(|e| ExperimentalAgentError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::catalog::ModelCatalog;
    use crate::contracts::{Domain, FitQuality};

    fn hypothesis() -> Hypothesis {
        Hypothesis {
            id: Uuid::new_v4(),
            statement: "Reaction rate rises with temperature".to_string(),
            domain: Domain::Chemistry,
            model: ModelCatalog::new().select(Domain::Chemistry, "temperature").unwrap(),
            confidence_prior: 0.7,
            principles: Vec::new(),
        }
    }

    fn agent_with(overrides: ExperimentOverrides) -> ExperimentalAgent {
        ExperimentalAgent::with_config(
            ExperimentalAgentConfig {
                overrides,
                ..Default::default()
            },
            StatisticalAnalyzer::new(),
        )
    }

    #[test]
    fn test_design_uses_domain_defaults() {
        let design = ExperimentalAgent::new().design_for(&hypothesis());
        assert_eq!(design.sample_count, 25);
        assert_eq!(design.noise_level, 0.05);
        assert_eq!(design.seed, Some(DEFAULT_SEED));
        assert_eq!(design.value_range.min, 280.0);
        assert_eq!(design.independent_variable, "temperature");
    }

    #[tokio::test]
    async fn test_noiseless_experiment_is_strong() {
        let agent = agent_with(ExperimentOverrides {
            sample_count: Some(10),
            noise_level: Some(0.0),
            seed: None,
        });
        let result = agent.run_experiment(&hypothesis()).await.unwrap();
        assert_eq!(result.observations.len(), 10);
        assert_eq!(result.analysis.fit_quality, FitQuality::Strong);
        assert!(result.analysis.confidence_score >= 0.9);
    }

    #[tokio::test]
    async fn test_same_seed_reproduces_observations() {
        let agent = agent_with(ExperimentOverrides {
            seed: Some(99),
            ..Default::default()
        });
        let h = hypothesis();
        let a = agent.run_experiment(&h).await.unwrap();
        let b = agent.run_experiment(&h).await.unwrap();
        assert_eq!(a.observations, b.observations);
    }

    #[tokio::test]
    async fn test_zero_samples_is_simulation_error() {
        let agent = agent_with(ExperimentOverrides {
            sample_count: Some(0),
            ..Default::default()
        });
        let err = agent.run_experiment(&hypothesis()).await.unwrap_err();
        assert_eq!(err, ExperimentalAgentError::Simulation(SimulationError::InvalidSampleCount(0)));
        assert_eq!(err.to_string(), SimulationError::InvalidSampleCount(0).to_string());
    }

    #[tokio::test]
    async fn test_invoke_record_confidence() {
        let (result, record) = ExperimentalAgent::new().invoke(hypothesis()).await.unwrap();
        assert_eq!(record.stage, PipelineStage::Experiment);
        assert_eq!(record.confidence, result.analysis.confidence_score);
    }
}
