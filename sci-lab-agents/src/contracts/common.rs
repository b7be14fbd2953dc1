//! Common Contract Types
//!
//! Shared types used across all agent contracts.

use serde::{Deserialize, Serialize};

/// Agent identification for registration and versioning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentIdentity {
    /// Unique agent identifier
    pub id: String,

    /// Semantic version
    pub version: String,

    /// Agent classification
    pub classification: AgentClassification,

    /// Human-readable description
    pub description: String,
}

/// Role an agent plays in an investigation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentClassification {
    HypothesisGeneration,
    ExperimentExecution,
    EvidenceSynthesis,
}
