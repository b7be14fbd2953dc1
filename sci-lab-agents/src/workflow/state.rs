//! Workflow State
//!
//! Single source of truth for one investigation run. Stages advance
//! strictly in order:
//!
//! ```text
//! started -> theory_done -> experiment_done -> collected
//!    \____________\_______________\_____________> failed
//! ```
//!
//! A failed run keeps the last stage it completed, so progress never
//! advances past the stage that failed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::contracts::{
    Classification, Conclusion, ExperimentResult, Hypothesis, PipelineStage, StageRecord, WorkflowStage,
};

/// Illegal state transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Illegal workflow transition from {from} to {to}")]
pub struct TransitionError {
    pub from: WorkflowStage,
    pub to: WorkflowStage,
}

/// Why and where a run stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stage that failed
    pub stage: PipelineStage,
    /// Last stage that completed before the failure
    pub last_completed: WorkflowStage,
    pub message: String,
}

/// Stage required before `stage` may run, and the stage reached after it.
fn transition_for(stage: PipelineStage) -> (WorkflowStage, WorkflowStage) {
    match stage {
        PipelineStage::Theory => (WorkflowStage::Started, WorkflowStage::TheoryDone),
        PipelineStage::Experiment => (WorkflowStage::TheoryDone, WorkflowStage::ExperimentDone),
        PipelineStage::Collection => (WorkflowStage::ExperimentDone, WorkflowStage::Collected),
    }
}

/// State of one investigation run.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowState {
    run_id: Uuid,
    question: String,
    stage: WorkflowStage,
    started_at: DateTime<Utc>,
    classification: Option<Classification>,
    hypothesis: Option<Hypothesis>,
    experiment: Option<ExperimentResult>,
    conclusion: Option<Conclusion>,
    error: Option<ErrorInfo>,
    records: Vec<StageRecord>,
}

impl WorkflowState {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            question: question.into(),
            stage: WorkflowStage::Started,
            started_at: Utc::now(),
            classification: None,
            hypothesis: None,
            experiment: None,
            conclusion: None,
            error: None,
            records: Vec::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn stage(&self) -> WorkflowStage {
        self.stage
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Furthest stage completed; for failed runs, the stage before the failure.
    pub fn last_completed(&self) -> WorkflowStage {
        match &self.error {
            Some(info) => info.last_completed,
            None => self.stage,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.stage, WorkflowStage::Collected | WorkflowStage::Failed)
    }

    pub fn classification(&self) -> Option<&Classification> {
        self.classification.as_ref()
    }

    pub fn hypothesis(&self) -> Option<&Hypothesis> {
        self.hypothesis.as_ref()
    }

    pub fn experiment(&self) -> Option<&ExperimentResult> {
        self.experiment.as_ref()
    }

    pub fn conclusion(&self) -> Option<&Conclusion> {
        self.conclusion.as_ref()
    }

    pub fn error(&self) -> Option<&ErrorInfo> {
        self.error.as_ref()
    }

    /// Audit records of the stages completed so far, in order.
    pub fn records(&self) -> &[StageRecord] {
        &self.records
    }

    pub fn set_classification(&mut self, classification: Classification) {
        self.classification = Some(classification);
    }

    fn advance(&mut self, stage: PipelineStage, record: StageRecord) -> Result<(), TransitionError> {
        let (required, next) = transition_for(stage);
        if self.stage != required {
            return Err(TransitionError { from: self.stage, to: next });
        }
        self.stage = next;
        self.records.push(record);
        Ok(())
    }

    pub fn record_theory(&mut self, hypothesis: Hypothesis, record: StageRecord) -> Result<(), TransitionError> {
        self.advance(PipelineStage::Theory, record)?;
        self.hypothesis = Some(hypothesis);
        Ok(())
    }

    pub fn record_experiment(&mut self, result: ExperimentResult, record: StageRecord) -> Result<(), TransitionError> {
        self.advance(PipelineStage::Experiment, record)?;
        self.experiment = Some(result);
        Ok(())
    }

    pub fn record_conclusion(&mut self, conclusion: Conclusion, record: StageRecord) -> Result<(), TransitionError> {
        self.advance(PipelineStage::Collection, record)?;
        self.conclusion = Some(conclusion);
        Ok(())
    }

    /// Move a live run to `failed`.
    pub fn fail(&mut self, stage: PipelineStage, message: impl Into<String>) -> Result<(), TransitionError> {
        if self.is_terminal() {
            return Err(TransitionError { from: self.stage, to: WorkflowStage::Failed });
        }
        self.error = Some(ErrorInfo {
            stage,
            last_completed: self.stage,
            message: message.into(),
        });
        self.stage = WorkflowStage::Failed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(stage: PipelineStage) -> StageRecord {
        StageRecord::builder()
            .agent_id("test-agent")
            .agent_version("1.0.0")
            .stage(stage)
            .inputs_hash("0".repeat(64))
            .outputs(serde_json::json!({}))
            .confidence(0.5)
            .build()
            .unwrap()
    }

    #[test]
    fn test_out_of_order_transition_is_rejected() {
        let mut state = WorkflowState::new("q");
        assert_eq!(state.stage(), WorkflowStage::Started);

        let err = state.advance(PipelineStage::Experiment, record(PipelineStage::Experiment)).unwrap_err();
        assert_eq!(err, TransitionError { from: WorkflowStage::Started, to: WorkflowStage::ExperimentDone });
        assert_eq!(state.stage(), WorkflowStage::Started);
        assert!(state.records().is_empty());
    }

    #[test]
    fn test_stage_cannot_run_twice() {
        let mut state = WorkflowState::new("q");
        state.advance(PipelineStage::Theory, record(PipelineStage::Theory)).unwrap();
        assert_eq!(state.stage(), WorkflowStage::TheoryDone);
        assert!(state.advance(PipelineStage::Theory, record(PipelineStage::Theory)).is_err());
        assert_eq!(state.records().len(), 1);
    }

    #[test]
    fn test_failure_keeps_last_completed() {
        let mut state = WorkflowState::new("q");
        state.advance(PipelineStage::Theory, record(PipelineStage::Theory)).unwrap();
        state.fail(PipelineStage::Experiment, "boom").unwrap();

        assert_eq!(state.stage(), WorkflowStage::Failed);
        assert_eq!(state.last_completed(), WorkflowStage::TheoryDone);
        let info = state.error().unwrap();
        assert_eq!(info.stage, PipelineStage::Experiment);
        assert_eq!(info.message, "boom");

        assert!(state.fail(PipelineStage::Collection, "again").is_err());
        assert!(state.advance(PipelineStage::Experiment, record(PipelineStage::Experiment)).is_err());
    }
}
