//! Scientific Investigation Agents
//!
//! This crate answers a free-text scientific question with a scripted,
//! fully offline-capable pipeline:
//!
//! 1. **Classify** the question into a [`Domain`] by weighted keywords
//! 2. **Theory**: the [`TheoreticalAgent`] picks a candidate model and asks a
//!    language model for a testable hypothesis
//! 3. **Experiment**: the [`ExperimentalAgent`] simulates data over the
//!    model's valid range and analyses it
//! 4. **Collection**: the [`CollectorAgent`] reconciles theory and data into
//!    a [`Conclusion`]
//!
//! The [`WorkflowCoordinator`] runs the stages in order as a state machine
//! (`started -> theory_done -> experiment_done -> collected`, or `failed`).
//! Each stage leaves a [`StageRecord`] in the audit trail.
//!
//! # Determinism
//!
//! Given the same question, configuration, seed and language-model output,
//! a run produces the same hypothesis model, observations and verdict.
//! Simulated noise comes from a seeded ChaCha8 generator.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sci_lab_agents::{InvestigationConfig, OfflineLanguageModel, StaticKnowledgeBase, WorkflowCoordinator};
//!
//! let config = InvestigationConfig::load(None)?;
//! let coordinator = WorkflowCoordinator::new(
//!     &config,
//!     Arc::new(OfflineLanguageModel),
//!     Arc::new(StaticKnowledgeBase::new()),
//! );
//!
//! let conclusion = coordinator
//!     .investigate("How does temperature affect chemical reaction rate?")
//!     .await?;
//! println!("{}: {}", conclusion.verdict(), conclusion.summary());
//! ```
//!
//! # Modules
//!
//! - [`classifier`]: keyword domain classifier
//! - [`simulation`]: seeded simulation engine and domain generators
//! - [`statistics`]: model/observation comparison
//! - [`agents`]: theoretical, experimental and collector agents
//! - [`workflow`]: state machine and coordinator
//! - [`clients`]: language-model clients
//! - [`knowledge`]: domain principles
//! - [`contracts`]: shared data types
//! - [`config`]: investigation configuration

#![warn(rustdoc::missing_crate_level_docs)]

pub mod agents;
pub mod classifier;
pub mod clients;
pub mod config;
pub mod contracts;
pub mod knowledge;
pub mod simulation;
pub mod statistics;
pub mod workflow;

// Re-export commonly used types
pub use agents::{
    Agent, AgentTelemetry, CollectorAgent, CollectorAgentError, ExperimentOverrides, ExperimentalAgent,
    ExperimentalAgentError, TheoreticalAgent, TheoreticalAgentError, COLLECTOR_AGENT_ID, EXPERIMENTAL_AGENT_ID,
    THEORETICAL_AGENT_ID,
};
pub use classifier::DomainClassifier;
pub use clients::{
    GeminiClient, GeminiConfig, LanguageModel, LanguageModelError, OfflineLanguageModel, StaticLanguageModel,
};
pub use config::{ConfigError, InvestigationConfig};
pub use contracts::{
    Classification, Conclusion, Domain, ExperimentResult, FailureReport, Hypothesis, MathModel, PipelineStage,
    StageRecord, Verdict, WorkflowStage,
};
pub use knowledge::{KnowledgeBase, StaticKnowledgeBase};
pub use simulation::{SimulationEngine, SimulationError};
pub use statistics::{AnalysisError, StatisticalAnalyzer};
pub use workflow::{InvestigationReport, StageError, WorkflowCoordinator, WorkflowError, WorkflowState};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Identity of each pipeline agent, for listings.
#[derive(Debug, Clone)]
pub struct AgentRegistration {
    pub id: &'static str,
    pub stage: PipelineStage,
    pub description: &'static str,
}

/// Registration info for all pipeline agents, in execution order.
pub fn agent_registrations() -> Vec<AgentRegistration> {
    vec![
        AgentRegistration {
            id: THEORETICAL_AGENT_ID,
            stage: PipelineStage::Theory,
            description: "Forms a testable hypothesis and candidate model",
        },
        AgentRegistration {
            id: EXPERIMENTAL_AGENT_ID,
            stage: PipelineStage::Experiment,
            description: "Simulates and analyses an experiment",
        },
        AgentRegistration {
            id: COLLECTOR_AGENT_ID,
            stage: PipelineStage::Collection,
            description: "Reconciles theory and data into a verdict",
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_registrations() {
        let registrations = agent_registrations();
        assert_eq!(registrations.len(), 3);
        assert_eq!(registrations[0].id, THEORETICAL_AGENT_ID);
        assert_eq!(registrations[2].stage, PipelineStage::Collection);
    }
}
