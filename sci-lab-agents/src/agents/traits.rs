//! Agent Traits
//!
//! Common traits that every investigation agent implements.

use async_trait::async_trait;
use std::time::Instant;

use crate::contracts::{AgentIdentity, PipelineStage, StageRecord};

/// One stage of an investigation.
///
/// Every invocation validates its input, executes, and produces exactly one
/// [`StageRecord`] for the audit trail. Agents hold no state between calls.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Input type for this agent
    type Input: Clone + Send + Sync;

    /// Output type for this agent
    type Output: Clone + Send + Sync;

    /// Error type for this agent
    type Error: std::error::Error + Send + Sync;

    /// Get the agent's identity.
    fn identity(&self) -> &AgentIdentity;

    /// Pipeline stage the agent runs in.
    fn stage(&self) -> PipelineStage;

    /// Get the agent's version.
    fn version(&self) -> &str {
        &self.identity().version
    }

    /// Get the agent's ID.
    fn agent_id(&self) -> &str {
        &self.identity().id
    }

    /// Reject inputs the agent cannot work with.
    fn validate_input(&self, input: &Self::Input) -> Result<(), Self::Error>;

    /// Execute the agent's core logic.
    async fn execute(&self, input: Self::Input) -> Result<Self::Output, Self::Error>;

    /// Build the audit record for a successful execution.
    fn build_stage_record(
        &self,
        input: &Self::Input,
        output: &Self::Output,
        duration_ms: u64,
    ) -> Result<StageRecord, Self::Error>;

    /// Full invocation cycle: validate, execute, build record.
    async fn invoke(&self, input: Self::Input) -> Result<(Self::Output, StageRecord), Self::Error> {
        self.validate_input(&input)?;

        let start = Instant::now();
        let output = self.execute(input.clone()).await?;
        let duration_ms = start.elapsed().as_millis() as u64;

        let record = self.build_stage_record(&input, &output, duration_ms)?;
        Ok((output, record))
    }
}
