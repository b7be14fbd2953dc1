//! Scientific Investigation Lab - HTTP Service
//!
//! # Routes
//!
//! - `GET /health` - liveness probe
//! - `GET /api/v1/domains` - domains with their experiment defaults
//! - `GET /api/v1/agents` - pipeline agents in execution order
//! - `POST /api/v1/investigate` - run one investigation
//!
//! `POST /api/v1/investigate` answers 200 with the full report, 422 with a
//! failure report when a stage fails, and 400 when the request is invalid.

use anyhow::Result;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use validator::Validate;

use sci_lab_agents::{
    agent_registrations, Domain, ExperimentOverrides, GeminiClient, InvestigationConfig, LanguageModel,
    OfflineLanguageModel, StaticKnowledgeBase, WorkflowCoordinator,
};

mod config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    coordinator: Arc<WorkflowCoordinator>,
    investigation: Arc<InvestigationConfig>,
}

impl AppState {
    pub fn new(config: &config::Config) -> Result<Self> {
        let investigation = config.investigation()?;
        let language_model: Arc<dyn LanguageModel> = if config.offline {
            Arc::new(OfflineLanguageModel)
        } else {
            Arc::new(
                GeminiClient::from_env()
                    .map_err(|e| anyhow::anyhow!("Failed to create language model client: {}", e))?,
            )
        };
        Ok(Self::with_model(investigation, language_model))
    }

    pub fn with_model(investigation: InvestigationConfig, language_model: Arc<dyn LanguageModel>) -> Self {
        let coordinator = WorkflowCoordinator::new(&investigation, language_model, Arc::new(StaticKnowledgeBase::new()));
        Self {
            coordinator: Arc::new(coordinator),
            investigation: Arc::new(investigation),
        }
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/domains", get(list_domains))
        .route("/api/v1/agents", get(list_agents))
        .route("/api/v1/investigate", post(investigate))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::Config::load()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("sci_lab_server={0},sci_lab_agents={0},tower_http=info", config.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!(
        service = %config.service_name,
        version = %config.service_version,
        port = config.port,
        platform_env = ?config.platform_env,
        offline = config.offline,
        "Starting investigation service"
    );
    if !config.offline && !config.has_api_key {
        warn!("GOOGLE_API_KEY is not set; investigations will fail at the theory stage");
    }

    let state = AppState::new(&config)?;
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(address = %addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// =============================================================================
// Health
// =============================================================================

async fn health_check() -> &'static str {
    "OK"
}

// =============================================================================
// Catalogue Endpoints
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct DomainInfo {
    pub domain: Domain,
    pub sample_count: usize,
    pub noise_level: f64,
    pub theory: String,
}

/// GET /api/v1/domains
async fn list_domains(State(state): State<AppState>) -> Json<Vec<DomainInfo>> {
    Json(
        Domain::ALL
            .iter()
            .map(|&domain| {
                let defaults = state.investigation.domain_defaults(domain);
                DomainInfo {
                    domain,
                    sample_count: defaults.sample_count,
                    noise_level: defaults.noise_level,
                    theory: domain.theoretical_context().to_string(),
                }
            })
            .collect(),
    )
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AgentInfoResponse {
    pub id: String,
    pub stage: String,
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AgentsListResponse {
    pub agents: Vec<AgentInfoResponse>,
    pub count: usize,
}

/// GET /api/v1/agents
async fn list_agents() -> Json<AgentsListResponse> {
    let agents: Vec<AgentInfoResponse> = agent_registrations()
        .into_iter()
        .map(|r| AgentInfoResponse {
            id: r.id.to_string(),
            stage: r.stage.to_string(),
            description: r.description.to_string(),
        })
        .collect();
    let count = agents.len();
    Json(AgentsListResponse { agents, count })
}

// =============================================================================
// Investigation Endpoint
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InvestigateRequest {
    #[validate(length(min = 1, max = 2000))]
    pub question: String,

    #[serde(default)]
    #[validate(range(min = 1, max = 100000))]
    pub sample_count: Option<usize>,

    #[serde(default)]
    #[validate(range(min = 0.0, max = 1.0))]
    pub noise_level: Option<f64>,

    #[serde(default)]
    pub seed: Option<u64>,
}

impl InvestigateRequest {
    fn overrides(&self) -> ExperimentOverrides {
        ExperimentOverrides {
            sample_count: self.sample_count,
            noise_level: self.noise_level,
            seed: self.seed,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: Option<String>,
}

fn bad_request(error: &str, details: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: error.to_string(),
            details: Some(details),
        }),
    )
        .into_response()
}

/// POST /api/v1/investigate
async fn investigate(
    State(state): State<AppState>,
    payload: Result<Json<InvestigateRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return bad_request("invalid_request", rejection.body_text()),
    };
    if request.question.trim().is_empty() {
        return bad_request("validation_failed", "question must not be blank".to_string());
    }
    if let Err(e) = request.validate() {
        return bad_request("validation_failed", e.to_string());
    }

    let coordinator = state.coordinator.as_ref().clone().with_experiment_overrides(request.overrides());
    match coordinator.run(&request.question).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => {
            warn!(stage = %err.stage, cause = %err.cause, "Investigation failed");
            (StatusCode::UNPROCESSABLE_ENTITY, Json(err.failure_report())).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_state() -> AppState {
        let config = InvestigationConfig {
            narrative: false,
            ..Default::default()
        };
        AppState::with_model(config, Arc::new(OfflineLanguageModel))
    }

    fn request(question: &str) -> InvestigateRequest {
        InvestigateRequest {
            question: question.to_string(),
            sample_count: None,
            noise_level: None,
            seed: None,
        }
    }

    #[tokio::test]
    async fn test_investigate_ok() {
        let response = investigate(
            State(offline_state()),
            Ok(Json(request("How does temperature affect chemical reaction rate?"))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_investigate_stage_failure_is_unprocessable() {
        // An empty model reply fails the theory stage.
        let state = AppState::with_model(
            InvestigationConfig::default(),
            Arc::new(sci_lab_agents::StaticLanguageModel::new("")),
        );

        let response = investigate(
            State(state),
            Ok(Json(request("How does temperature affect chemical reaction rate?"))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_investigate_rejects_invalid_request() {
        let response = investigate(State(offline_state()), Ok(Json(request("  ")))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let mut req = request("How does force affect acceleration?");
        req.sample_count = Some(0);
        let response = investigate(State(offline_state()), Ok(Json(req))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_domains() {
        let Json(domains) = list_domains(State(offline_state())).await;
        assert_eq!(domains.len(), 6);
        assert_eq!(domains[1].domain, Domain::Chemistry);
        assert_eq!(domains[1].sample_count, 25);
    }

    #[tokio::test]
    async fn test_list_agents() {
        let Json(response) = list_agents().await;
        assert_eq!(response.count, 3);
        assert_eq!(response.agents[0].stage, "theory");
    }
}
