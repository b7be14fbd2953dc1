//! Shared command context

use anyhow::{Context as _, Result};
use std::sync::Arc;

use sci_lab_agents::{
    GeminiClient, InvestigationConfig, LanguageModel, OfflineLanguageModel, StaticKnowledgeBase, WorkflowCoordinator,
};

use crate::cli::Cli;
use crate::output::Output;

/// Settings resolved once from the command line, config file and environment.
pub struct Context {
    pub output: Output,
    pub config: InvestigationConfig,
    pub offline: bool,
    pub verbose: bool,
}

impl Context {
    pub fn new(cli: &Cli) -> Result<Self> {
        let config = InvestigationConfig::load(cli.config.as_deref()).with_context(|| match &cli.config {
            Some(path) => format!("Failed to load configuration from {}", path.display()),
            None => "Failed to load configuration".to_string(),
        })?;

        Ok(Self {
            output: Output::new(cli.output, cli.no_color),
            config,
            offline: cli.offline,
            verbose: cli.verbose,
        })
    }

    /// Remote model, or the template model when running offline.
    pub fn language_model(&self) -> Result<Arc<dyn LanguageModel>> {
        if self.offline {
            return Ok(Arc::new(OfflineLanguageModel));
        }
        let client = GeminiClient::from_env().context("Failed to create language model client (try --offline)")?;
        Ok(Arc::new(client))
    }

    pub fn coordinator(&self) -> Result<WorkflowCoordinator> {
        Ok(WorkflowCoordinator::new(
            &self.config,
            self.language_model()?,
            Arc::new(StaticKnowledgeBase::new()),
        ))
    }
}
