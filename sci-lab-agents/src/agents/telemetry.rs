//! Agent Telemetry Module
//!
//! Structured stage events for investigation runs. Events go out through
//! `tracing` and are mirrored as `metrics` counters and histograms:
//!
//! - `investigation_stage_events_total{agent_id, event_type}`
//! - `investigation_stage_duration_ms{agent_id}`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, span, Level};
use uuid::Uuid;

/// Telemetry event types for stage operations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryEventType {
    /// Stage execution started
    StageStarted,
    /// Stage execution completed successfully
    StageCompleted,
    /// Stage execution failed
    StageFailed,
    /// Output handed to the next stage
    Handoff,
    /// Warning generated
    WarningGenerated,
}

impl std::fmt::Display for TelemetryEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StageStarted => write!(f, "stage_started"),
            Self::StageCompleted => write!(f, "stage_completed"),
            Self::StageFailed => write!(f, "stage_failed"),
            Self::Handoff => write!(f, "handoff"),
            Self::WarningGenerated => write!(f, "warning_generated"),
        }
    }
}

/// Telemetry event structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryEvent {
    /// Event type
    pub event_type: TelemetryEventType,
    /// Agent ID that emitted the event
    pub agent_id: String,
    /// Timestamp of the event
    pub timestamp: DateTime<Utc>,
    /// Additional metadata
    pub metadata: serde_json::Value,
}

impl TelemetryEvent {
    pub fn new(
        event_type: TelemetryEventType,
        agent_id: impl Into<String>,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            event_type,
            agent_id: agent_id.into(),
            timestamp: Utc::now(),
            metadata,
        }
    }
}

/// Telemetry emitter bound to one agent.
#[derive(Debug, Clone)]
pub struct AgentTelemetry {
    /// Agent ID for correlation
    agent_id: String,
    /// Enable telemetry emission
    enabled: bool,
}

impl AgentTelemetry {
    /// Create a new telemetry emitter for an agent.
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            enabled: true,
        }
    }

    /// Create a disabled telemetry emitter (for testing).
    pub fn disabled(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            enabled: false,
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Emit a telemetry event.
    pub fn emit(&self, event: TelemetryEvent) {
        if !self.enabled {
            return;
        }

        let span = span!(
            Level::INFO,
            "stage_telemetry",
            agent_id = %self.agent_id,
            event_type = %event.event_type,
        );
        let _guard = span.enter();

        match event.event_type {
            TelemetryEventType::StageStarted => {
                info!(metadata = %event.metadata, "Stage started");
            }
            TelemetryEventType::StageCompleted => {
                info!(metadata = %event.metadata, "Stage completed");
            }
            TelemetryEventType::StageFailed => {
                tracing::error!(metadata = %event.metadata, "Stage failed");
            }
            TelemetryEventType::WarningGenerated => {
                tracing::warn!(metadata = %event.metadata, "Warning generated");
            }
            TelemetryEventType::Handoff => {
                debug!(metadata = %event.metadata, "Stage handoff");
            }
        }

        self.emit_metrics(&event);
    }

    fn emit_metrics(&self, event: &TelemetryEvent) {
        // metrics labels need owned strings
        let agent_id = self.agent_id.clone();

        metrics::counter!(
            "investigation_stage_events_total",
            "agent_id" => agent_id.clone(),
            "event_type" => event.event_type.to_string()
        )
        .increment(1);

        if let Some(duration_ms) = event.metadata.get("duration_ms").and_then(|v| v.as_u64()) {
            metrics::histogram!(
                "investigation_stage_duration_ms",
                "agent_id" => agent_id
            )
            .record(duration_ms as f64);
        }
    }

    fn event(&self, event_type: TelemetryEventType, metadata: serde_json::Value) {
        self.emit(TelemetryEvent::new(event_type, self.agent_id.clone(), metadata));
    }

    pub fn stage_started(&self, run_id: Uuid, metadata: serde_json::Value) {
        let mut merged = serde_json::json!({ "run_id": run_id });
        if let (Some(base), Some(extra)) = (merged.as_object_mut(), metadata.as_object()) {
            base.extend(extra.clone());
        }
        self.event(TelemetryEventType::StageStarted, merged);
    }

    pub fn stage_completed(&self, run_id: Uuid, duration_ms: u64, result: serde_json::Value) {
        self.event(
            TelemetryEventType::StageCompleted,
            serde_json::json!({
                "run_id": run_id,
                "duration_ms": duration_ms,
                "result": result,
            }),
        );
    }

    pub fn stage_failed(&self, run_id: Uuid, error: &str) {
        self.event(
            TelemetryEventType::StageFailed,
            serde_json::json!({
                "run_id": run_id,
                "error": error,
            }),
        );
    }

    /// Record the hand-off of one stage's output to the next agent.
    pub fn handoff(&self, run_id: Uuid, to_agent: &str, payload: &str) {
        self.event(
            TelemetryEventType::Handoff,
            serde_json::json!({
                "run_id": run_id,
                "to": to_agent,
                "payload": payload,
            }),
        );
    }

    pub fn warning(&self, message: &str, context: serde_json::Value) {
        self.event(
            TelemetryEventType::WarningGenerated,
            serde_json::json!({
                "message": message,
                "context": context,
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_display() {
        assert_eq!(TelemetryEventType::StageStarted.to_string(), "stage_started");
        assert_eq!(TelemetryEventType::StageFailed.to_string(), "stage_failed");
        assert_eq!(TelemetryEventType::Handoff.to_string(), "handoff");
    }

    #[test]
    fn test_disabled_telemetry() {
        let telemetry = AgentTelemetry::disabled("test-agent");
        assert!(!telemetry.is_enabled());
        telemetry.stage_started(Uuid::new_v4(), serde_json::json!({}));
        telemetry.stage_completed(Uuid::new_v4(), 3, serde_json::json!({}));
    }

    #[test]
    fn test_event_serialization() {
        let event = TelemetryEvent::new(
            TelemetryEventType::StageCompleted,
            "collector-agent-v1",
            serde_json::json!({ "duration_ms": 12 }),
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("stage_completed"));
        assert!(json.contains("collector-agent-v1"));
    }
}
