//! Integration Tests for the Investigation Pipeline
//!
//! # Test Categories
//!
//! 1. **End-to-end runs**: classify, theory, experiment, collection
//! 2. **Audit trail**: one StageRecord per completed stage
//! 3. **Determinism**: same seed, same observations and verdict
//! 4. **Failure handling**: stage, cause and final state of failed runs

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use sci_lab_agents::{
    agents::ExperimentOverrides,
    contracts::{ClassificationAmbiguous, FitQuality, ModelForm},
    simulation::SimulationError,
    Agent, Domain, ExperimentalAgentError, InvestigationConfig, LanguageModel, LanguageModelError,
    OfflineLanguageModel, PipelineStage, StageError, StaticKnowledgeBase, StaticLanguageModel,
    TheoreticalAgentError, Verdict, WorkflowCoordinator, WorkflowStage, EXPERIMENTAL_AGENT_ID,
};

// ============================================================================
// TEST FIXTURES
// ============================================================================

const CHEMISTRY_QUESTION: &str = "How does temperature affect chemical reaction rate?";

/// Language model that never answers in time.
struct StalledLanguageModel;

#[async_trait]
impl LanguageModel for StalledLanguageModel {
    fn name(&self) -> &str {
        "stalled"
    }

    async fn generate_text(&self, _prompt: &str, _timeout: Duration) -> Result<String, LanguageModelError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok("HYPOTHESIS: too late".to_string())
    }
}

fn config() -> InvestigationConfig {
    InvestigationConfig {
        narrative: false,
        ..Default::default()
    }
}

fn coordinator_with(config: &InvestigationConfig, model: Arc<dyn LanguageModel>) -> WorkflowCoordinator {
    WorkflowCoordinator::new(config, model, Arc::new(StaticKnowledgeBase::new()))
}

fn offline_coordinator() -> WorkflowCoordinator {
    coordinator_with(&config(), Arc::new(OfflineLanguageModel))
}

// ============================================================================
// END-TO-END RUNS
// ============================================================================

mod end_to_end {
    use super::*;

    #[tokio::test]
    async fn test_noiseless_chemistry_investigation_is_supported() {
        let coordinator = coordinator_with(
            &config(),
            Arc::new(StaticLanguageModel::new(
                "HYPOTHESIS: Reaction rate increases exponentially with temperature\nCONFIDENCE: 0.8",
            )),
        )
        .with_experiment_overrides(ExperimentOverrides {
            sample_count: Some(10),
            noise_level: Some(0.0),
            seed: None,
        });

        let report = coordinator.run(CHEMISTRY_QUESTION).await.expect("run should succeed");

        assert_eq!(report.classification.domain, Domain::Chemistry);
        assert_eq!(report.hypothesis.model.form(), ModelForm::Arrhenius);
        assert_eq!(report.hypothesis.confidence_prior, 0.8);

        let design = &report.experiment.design;
        assert_eq!(design.sample_count, 10);
        assert_eq!(design.value_range.min, 280.0);
        assert_eq!(design.value_range.max, 400.0);

        let observations = &report.experiment.observations;
        assert_eq!(observations.len(), 10);
        assert!(
            observations.windows(2).all(|w| w[0].measured_value < w[1].measured_value),
            "rate should increase with temperature"
        );

        assert_eq!(report.experiment.analysis.fit_quality, FitQuality::Strong);
        assert_eq!(report.conclusion.verdict(), Verdict::Supported);
        assert!(report.conclusion.confidence() >= 0.9);
        assert!(!report.conclusion.recommendations().is_empty());
        assert!(report.conclusion.recommendations().len() <= 6);
    }

    #[tokio::test]
    async fn test_every_domain_completes_offline() {
        let coordinator = offline_coordinator();
        let questions = [
            ("How does force affect acceleration?", Domain::Physics),
            (CHEMISTRY_QUESTION, Domain::Chemistry),
            ("How does light intensity affect plant photosynthesis?", Domain::Biology),
            ("How does CO2 concentration affect climate warming?", Domain::Environmental),
            ("How does turbine power affect efficiency?", Domain::Engineering),
            ("What drug dose gives the best treatment response?", Domain::Medicine),
        ];

        for (question, domain) in questions {
            let report = coordinator.run(question).await.expect(question);
            assert_eq!(report.classification.domain, domain, "{}", question);
            assert_eq!(report.records.len(), 3);
            assert!((0.0..=1.0).contains(&report.conclusion.confidence()));
        }
    }

    #[tokio::test]
    async fn test_unmatched_question_uses_fallback_domain() {
        let config = InvestigationConfig {
            fallback_domain: Domain::Engineering,
            ..config()
        };
        let report = coordinator_with(&config, Arc::new(OfflineLanguageModel))
            .run("Why is the sky blue?")
            .await
            .unwrap();

        assert_eq!(report.classification.domain, Domain::Engineering);
        assert_eq!(report.classification.confidence, 0.0);
        assert!(matches!(
            report.classification.ambiguity,
            Some(ClassificationAmbiguous::NoKeywordMatch { fallback: Domain::Engineering })
        ));
    }

    #[tokio::test]
    async fn test_narrative_discussion_is_attached() {
        let config = InvestigationConfig {
            narrative: true,
            ..Default::default()
        };
        let conclusion = coordinator_with(&config, Arc::new(OfflineLanguageModel))
            .investigate(CHEMISTRY_QUESTION)
            .await
            .unwrap();
        assert!(conclusion.discussion().is_some());
    }
}

// ============================================================================
// AUDIT TRAIL
// ============================================================================

mod audit_trail {
    use super::*;

    #[tokio::test]
    async fn test_one_record_per_stage_in_order() {
        let report = offline_coordinator().run(CHEMISTRY_QUESTION).await.unwrap();

        let stages: Vec<PipelineStage> = report.records.iter().map(|r| r.stage).collect();
        assert_eq!(
            stages,
            vec![PipelineStage::Theory, PipelineStage::Experiment, PipelineStage::Collection]
        );
        for record in &report.records {
            assert_eq!(record.inputs_hash.len(), 64, "inputs_hash should be SHA256 (64 hex chars)");
            assert!(!record.outputs.is_null());
            assert!((0.0..=1.0).contains(&record.confidence));
        }
        assert_eq!(report.records[1].agent_id, EXPERIMENTAL_AGENT_ID);
        assert_eq!(report.records[2].confidence, report.conclusion.confidence());
    }

    #[tokio::test]
    async fn test_agent_identity() {
        let agent = sci_lab_agents::ExperimentalAgent::new();
        assert_eq!(agent.agent_id(), EXPERIMENTAL_AGENT_ID);
        assert_eq!(agent.version(), sci_lab_agents::agents::EXPERIMENTAL_AGENT_VERSION);
        assert_eq!(agent.stage(), PipelineStage::Experiment);
    }
}

// ============================================================================
// DETERMINISM
// ============================================================================

mod determinism {
    use super::*;

    #[tokio::test]
    async fn test_same_seed_same_outcome() {
        let overrides = ExperimentOverrides {
            seed: Some(1234),
            ..Default::default()
        };
        let coordinator = offline_coordinator().with_experiment_overrides(overrides);

        let first = coordinator.run(CHEMISTRY_QUESTION).await.unwrap();
        let second = coordinator.run(CHEMISTRY_QUESTION).await.unwrap();

        assert_eq!(first.experiment.observations, second.experiment.observations);
        assert_eq!(first.experiment.analysis, second.experiment.analysis);
        assert_eq!(first.conclusion.verdict(), second.conclusion.verdict());
        assert_eq!(first.records[0].inputs_hash, second.records[0].inputs_hash);
        assert_ne!(first.run_id, second.run_id);
    }
}

// ============================================================================
// FAILURE HANDLING
// ============================================================================

mod failure_handling {
    use super::*;

    #[tokio::test]
    async fn test_zero_samples_fails_experiment_stage() {
        let err = offline_coordinator()
            .with_experiment_overrides(ExperimentOverrides {
                sample_count: Some(0),
                ..Default::default()
            })
            .investigate(CHEMISTRY_QUESTION)
            .await
            .unwrap_err();

        assert_eq!(err.stage, PipelineStage::Experiment);
        assert_eq!(
            err.cause,
            StageError::Experiment(ExperimentalAgentError::Simulation(SimulationError::InvalidSampleCount(0)))
        );
        assert_eq!(err.state.stage(), WorkflowStage::Failed);
        assert_eq!(err.state.last_completed(), WorkflowStage::TheoryDone);
        assert!(err.state.conclusion().is_none());

        let report = err.failure_report();
        assert_eq!(report.failed_stage, PipelineStage::Experiment);
        assert_eq!(report.last_completed, WorkflowStage::TheoryDone);
        assert_eq!(report.question, CHEMISTRY_QUESTION);
    }

    #[tokio::test(start_paused = true)]
    async fn test_language_model_timeout_fails_theory_stage() {
        let config = InvestigationConfig {
            llm_timeout_secs: 2,
            ..config()
        };
        let err = coordinator_with(&config, Arc::new(StalledLanguageModel))
            .investigate(CHEMISTRY_QUESTION)
            .await
            .unwrap_err();

        assert_eq!(err.stage, PipelineStage::Theory);
        assert!(matches!(err.cause, StageError::Theory(TheoreticalAgentError::ModelGenerationFailed(_))));
        assert_eq!(err.state.stage(), WorkflowStage::Failed);
        assert_eq!(err.state.last_completed(), WorkflowStage::Started);
        assert!(err.state.hypothesis().is_none());
        assert!(err.state.records().is_empty());

        let report = err.failure_report();
        assert!(report.cause.starts_with("Model generation failed"));
        assert!(report.recommendations.iter().any(|r| r.contains("SCI_LAB_LLM_TIMEOUT_SECS")));
    }

    #[tokio::test]
    async fn test_empty_question_fails_theory_stage() {
        let err = offline_coordinator().investigate("   ").await.unwrap_err();
        assert_eq!(err.stage, PipelineStage::Theory);
        assert!(matches!(err.cause, StageError::Theory(TheoreticalAgentError::Validation(_))));
    }
}
