//! Stage Record Schema
//!
//! Every agent invocation inside an investigation produces exactly one
//! [`StageRecord`]. Records form the audit trail of a run:
//!
//! - agent_id / agent_version: which agent produced the stage output
//! - stage: pipeline stage the agent ran in
//! - inputs_hash: SHA-256 of the serialized inputs, for determinism checks
//! - outputs: serialized stage output
//! - confidence: the agent's certainty in its output (0.0 - 1.0)
//! - duration_ms / timestamp: when and how long

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

/// Pipeline stage executed by an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Hypothesis generation
    Theory,
    /// Simulation and analysis
    Experiment,
    /// Synthesis of the final conclusion
    Collection,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Theory => write!(f, "theory"),
            Self::Experiment => write!(f, "experiment"),
            Self::Collection => write!(f, "collection"),
        }
    }
}

/// Progress marker of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    Started,
    TheoryDone,
    ExperimentDone,
    Collected,
    Failed,
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => write!(f, "started"),
            Self::TheoryDone => write!(f, "theory_done"),
            Self::ExperimentDone => write!(f, "experiment_done"),
            Self::Collected => write!(f, "collected"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Audit record of one agent invocation.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StageRecord {
    /// Unique identifier for this record
    pub id: Uuid,

    /// Agent identifier (e.g., "theoretical-agent-v1")
    #[validate(length(min = 1, max = 128))]
    pub agent_id: String,

    /// Agent version (semantic versioning)
    #[validate(length(min = 1, max = 32))]
    pub agent_version: String,

    /// Stage the agent executed
    pub stage: PipelineStage,

    /// SHA256 hash of inputs
    #[validate(length(equal = 64))]
    pub inputs_hash: String,

    /// Serialized stage output
    pub outputs: serde_json::Value,

    /// Agent confidence in its output
    #[validate(range(min = 0.0, max = 1.0))]
    pub confidence: f64,

    /// Wall time spent in the agent
    pub duration_ms: u64,

    /// UTC timestamp of record creation
    pub timestamp: DateTime<Utc>,

    /// Optional metadata
    pub metadata: Option<serde_json::Value>,
}

impl StageRecord {
    pub fn builder() -> StageRecordBuilder {
        StageRecordBuilder::default()
    }

    /// Compute SHA256 hash of input data for determinism verification.
    pub fn compute_inputs_hash<T: Serialize>(inputs: &T) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(inputs)?;
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }
}

/// Builder for StageRecord.
#[derive(Debug, Default)]
pub struct StageRecordBuilder {
    agent_id: Option<String>,
    agent_version: Option<String>,
    stage: Option<PipelineStage>,
    inputs_hash: Option<String>,
    outputs: Option<serde_json::Value>,
    confidence: Option<f64>,
    duration_ms: u64,
    metadata: Option<serde_json::Value>,
}

impl StageRecordBuilder {
    pub fn agent_id(mut self, id: impl Into<String>) -> Self {
        self.agent_id = Some(id.into());
        self
    }

    pub fn agent_version(mut self, version: impl Into<String>) -> Self {
        self.agent_version = Some(version.into());
        self
    }

    pub fn stage(mut self, stage: PipelineStage) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn inputs_hash(mut self, hash: impl Into<String>) -> Self {
        self.inputs_hash = Some(hash.into());
        self
    }

    pub fn outputs(mut self, outputs: serde_json::Value) -> Self {
        self.outputs = Some(outputs);
        self
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Build the StageRecord.
    ///
    /// # Errors
    ///
    /// Returns an error if required fields are missing.
    pub fn build(self) -> Result<StageRecord, StageRecordBuildError> {
        let agent_id = self.agent_id.ok_or(StageRecordBuildError::MissingField("agent_id"))?;
        let agent_version = self.agent_version.ok_or(StageRecordBuildError::MissingField("agent_version"))?;
        let stage = self.stage.ok_or(StageRecordBuildError::MissingField("stage"))?;
        let inputs_hash = self.inputs_hash.ok_or(StageRecordBuildError::MissingField("inputs_hash"))?;
        let outputs = self.outputs.ok_or(StageRecordBuildError::MissingField("outputs"))?;
        let confidence = self.confidence.ok_or(StageRecordBuildError::MissingField("confidence"))?;

        Ok(StageRecord {
            id: Uuid::new_v4(),
            agent_id,
            agent_version,
            stage,
            inputs_hash,
            outputs,
            confidence: confidence.clamp(0.0, 1.0),
            duration_ms: self.duration_ms,
            timestamp: Utc::now(),
            metadata: self.metadata,
        })
    }
}

/// Error type for StageRecord building.
#[derive(Debug, thiserror::Error)]
pub enum StageRecordBuildError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_record_builder() {
        let record = StageRecord::builder()
            .agent_id("theoretical-agent-v1")
            .agent_version("1.0.0")
            .stage(PipelineStage::Theory)
            .inputs_hash("a".repeat(64))
            .outputs(serde_json::json!({"statement": "rate rises with temperature"}))
            .confidence(1.4)
            .build()
            .expect("Failed to build StageRecord");

        assert_eq!(record.agent_id, "theoretical-agent-v1");
        assert_eq!(record.stage, PipelineStage::Theory);
        assert_eq!(record.confidence, 1.0);
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_missing_field() {
        let result = StageRecord::builder().agent_id("x").build();
        assert!(matches!(result, Err(StageRecordBuildError::MissingField("agent_version"))));
    }

    #[test]
    fn test_compute_inputs_hash() {
        let input = serde_json::json!({"question": "test", "samples": [1, 2, 3]});
        let hash = StageRecord::compute_inputs_hash(&input).expect("Failed to compute hash");

        assert_eq!(hash.len(), 64);

        let hash2 = StageRecord::compute_inputs_hash(&input).expect("Failed to compute hash");
        assert_eq!(hash, hash2);
    }

    #[test]
    fn test_stage_serialization() {
        let json = serde_json::to_string(&WorkflowStage::ExperimentDone).expect("Failed to serialize");
        assert_eq!(json, "\"experiment_done\"");
        assert_eq!(PipelineStage::Collection.to_string(), "collection");
    }
}
