//! Language Model Clients
//!
//! The theoretical and collector agents produce text through the
//! [`LanguageModel`] trait. Every call carries an explicit timeout and is
//! additionally bounded by [`generate_with_timeout`], so a client that
//! ignores its timeout argument still cannot stall a stage.
//!
//! Implementations:
//! - [`GeminiClient`]: Google `generateContent` REST endpoint
//! - [`OfflineLanguageModel`]: deterministic templated replies, no network
//! - [`StaticLanguageModel`]: fixed reply, for tests and fixtures

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

/// Errors from language-model calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LanguageModelError {
    #[error("Language model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Language model rate limited: {0}")]
    RateLimited(String),

    #[error("Language model authentication failed: {0}")]
    Auth(String),

    #[error("Language model error: {0}")]
    Unknown(String),
}

impl From<reqwest::Error> for LanguageModelError {
    fn from(err: reqwest::Error) -> Self {
        LanguageModelError::Unknown(err.to_string())
    }
}

/// Text generation collaborator.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model name for logs and stage records.
    fn name(&self) -> &str;

    /// Generate a completion for `prompt` within `timeout`.
    async fn generate_text(&self, prompt: &str, timeout: Duration) -> Result<String, LanguageModelError>;
}

/// Call `model` and fail with [`LanguageModelError::Timeout`] once `timeout` elapses.
pub async fn generate_with_timeout(
    model: &dyn LanguageModel,
    prompt: &str,
    timeout: Duration,
) -> Result<String, LanguageModelError> {
    match tokio::time::timeout(timeout, model.generate_text(prompt, timeout)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(model = model.name(), timeout_ms = timeout.as_millis() as u64, "Language model call timed out");
            Err(LanguageModelError::Timeout(timeout))
        }
    }
}

// =============================================================================
// Gemini
// =============================================================================

/// Gemini client configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API root
    pub base_url: String,

    /// API key (`GOOGLE_API_KEY`)
    pub api_key: Option<String>,

    /// Model name
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Completion length cap
    pub max_output_tokens: u32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/".to_string(),
            api_key: None,
            model: "gemini-2.0-flash".to_string(),
            temperature: 0.1,
            max_output_tokens: 4096,
        }
    }
}

impl GeminiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self {
            api_key: std::env::var("GOOGLE_API_KEY").ok().filter(|k| !k.is_empty()),
            ..Default::default()
        };
        if let Ok(model) = std::env::var("SCI_LAB_MODEL") {
            config.model = model;
        }
        if let Ok(base) = std::env::var("SCI_LAB_GEMINI_URL") {
            config.base_url = base;
        }
        config
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<PartRef<'a>>,
}

#[derive(Debug, Serialize)]
struct PartRef<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content.parts.iter().map(|p| p.text.as_str()).collect();
        Some(text)
    }
}

/// HTTP client for the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, LanguageModelError> {
        let client = Client::builder()
            .build()
            .map_err(|e| LanguageModelError::Unknown(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Create a client from environment variables.
    pub fn from_env() -> Result<Self, LanguageModelError> {
        Self::new(GeminiConfig::from_env())
    }

    fn build_url(&self) -> Result<Url, LanguageModelError> {
        Url::parse(&self.config.base_url)
            .and_then(|base| base.join(&format!("v1beta/models/{}:generateContent", self.config.model)))
            .map_err(|e| LanguageModelError::Unknown(format!("invalid base URL: {}", e)))
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    #[instrument(skip(self, prompt), fields(model = %self.config.model, prompt_len = prompt.len()))]
    async fn generate_text(&self, prompt: &str, timeout: Duration) -> Result<String, LanguageModelError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| LanguageModelError::Auth("GOOGLE_API_KEY is not set".to_string()))?;

        let body = GenerateContentRequest {
            contents: vec![Content { parts: vec![PartRef { text: prompt }] }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_output_tokens,
            },
        };

        let response = self
            .client
            .post(self.build_url()?)
            .query(&[("key", api_key)])
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LanguageModelError::Timeout(timeout)
                } else {
                    e.into()
                }
            })?;

        let status = response.status();
        match status {
            s if s.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(LanguageModelError::Auth(format!("status {}", status)));
            }
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(LanguageModelError::RateLimited(response.text().await.unwrap_or_default()));
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                return Err(LanguageModelError::Unknown(format!("status {}: {}", status, body)));
            }
        }

        let parsed: GenerateContentResponse = response.json().await?;
        let text = parsed
            .text()
            .ok_or_else(|| LanguageModelError::Unknown("response contained no candidates".to_string()))?;
        debug!(response_len = text.len(), "Language model responded");
        Ok(text)
    }
}

// =============================================================================
// Local models
// =============================================================================

/// Always replies with the same text.
#[derive(Debug, Clone)]
pub struct StaticLanguageModel {
    reply: String,
}

impl StaticLanguageModel {
    pub fn new(reply: impl Into<String>) -> Self {
        Self { reply: reply.into() }
    }
}

#[async_trait]
impl LanguageModel for StaticLanguageModel {
    fn name(&self) -> &str {
        "static"
    }

    async fn generate_text(&self, _prompt: &str, _timeout: Duration) -> Result<String, LanguageModelError> {
        Ok(self.reply.clone())
    }
}

/// Deterministic replies assembled from the tagged lines of a prompt.
///
/// Understands the `TASK:`, `QUESTION:`, `RELATIONSHIP:`, `VERDICT:` and
/// `STATEMENT:` lines that the agents put in their prompts.
#[derive(Debug, Clone, Default)]
pub struct OfflineLanguageModel;

fn tagged<'a>(prompt: &'a str, tag: &str) -> Option<&'a str> {
    prompt
        .lines()
        .find_map(|line| line.trim().strip_prefix(tag))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl LanguageModel for OfflineLanguageModel {
    fn name(&self) -> &str {
        "offline"
    }

    async fn generate_text(&self, prompt: &str, _timeout: Duration) -> Result<String, LanguageModelError> {
        match tagged(prompt, "TASK:") {
            Some("hypothesis") => {
                let question = tagged(prompt, "QUESTION:").unwrap_or("the question");
                let relationship = tagged(prompt, "RELATIONSHIP:").unwrap_or("the candidate model");
                Ok(format!(
                    "HYPOTHESIS: In answer to \"{}\", the response follows {}.\nCONFIDENCE: 0.7",
                    question.trim_end_matches('?'),
                    relationship
                ))
            }
            Some("discussion") => {
                let verdict = tagged(prompt, "VERDICT:").unwrap_or("inconclusive");
                let statement = tagged(prompt, "STATEMENT:").unwrap_or("the hypothesis");
                Ok(format!(
                    "The simulated data leave the hypothesis \"{}\" {}. The comparison is limited \
                     to one simulated sweep and should be repeated with independent seeds.",
                    statement, verdict
                ))
            }
            _ => Err(LanguageModelError::Unknown("offline model received an untagged prompt".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowModel;

    #[async_trait]
    impl LanguageModel for SlowModel {
        fn name(&self) -> &str {
            "slow"
        }

        async fn generate_text(&self, _prompt: &str, _timeout: Duration) -> Result<String, LanguageModelError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("late".to_string())
        }
    }

    #[tokio::test]
    async fn test_timeout_is_enforced() {
        let result = generate_with_timeout(&SlowModel, "prompt", Duration::from_millis(20)).await;
        assert_eq!(result, Err(LanguageModelError::Timeout(Duration::from_millis(20))));
    }

    #[tokio::test]
    async fn test_static_model() {
        let model = StaticLanguageModel::new("HYPOTHESIS: x");
        let text = generate_with_timeout(&model, "anything", Duration::from_secs(1)).await.unwrap();
        assert_eq!(text, "HYPOTHESIS: x");
    }

    #[tokio::test]
    async fn test_offline_model() {
        let model = OfflineLanguageModel;
        let prompt = "TASK: hypothesis\nQUESTION: Does heat speed reactions?\nRELATIONSHIP: k = A * exp(-Ea / (R * T))";
        let text = model.generate_text(prompt, Duration::from_secs(1)).await.unwrap();
        assert!(text.starts_with("HYPOTHESIS: In answer to \"Does heat speed reactions\""));
        assert!(text.contains("CONFIDENCE: 0.7"));

        assert!(model.generate_text("no tags", Duration::from_secs(1)).await.is_err());
    }

    #[test]
    fn test_build_url() {
        let client = GeminiClient::new(GeminiConfig::default()).unwrap();
        let url = client.build_url().unwrap();
        assert_eq!(
            url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_response_text_extraction() {
        let parsed: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"HYPOTHESIS: a"},{"text":"\nCONFIDENCE: 0.8"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.text().unwrap(), "HYPOTHESIS: a\nCONFIDENCE: 0.8");

        let empty: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.text().is_none());
    }

    #[tokio::test]
    async fn test_missing_api_key_is_auth_error() {
        let client = GeminiClient::new(GeminiConfig::default()).unwrap();
        let err = client.generate_text("hi", Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, LanguageModelError::Auth(_)));
    }
}
