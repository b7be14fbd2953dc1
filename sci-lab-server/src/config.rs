//! Service configuration
//!
//! Read from environment variables at startup:
//! - `SCI_LAB_PORT`: HTTP port (default 8080)
//! - `SCI_LAB_LOG_LEVEL`: default tracing filter when `RUST_LOG` is unset
//! - `SCI_LAB_ENV`: dev | staging | prod
//! - `SCI_LAB_CONFIG`: optional investigation config file (TOML)
//! - `SCI_LAB_OFFLINE`: `true` to answer with the offline language model
//! - `GOOGLE_API_KEY`: language model credentials (required in prod unless offline)
//!
//! Investigation settings (`SCI_LAB_SEED`, `SCI_LAB_LLM_TIMEOUT_SECS`, ...)
//! are applied by [`InvestigationConfig::load`].

use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;

use sci_lab_agents::InvestigationConfig;

/// Platform environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlatformEnv {
    #[default]
    Dev,
    Staging,
    Prod,
}

impl PlatformEnv {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Prod,
            "staging" => Self::Staging,
            _ => Self::Dev,
        }
    }
}

/// HTTP service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub platform_env: PlatformEnv,
    pub log_level: String,
    pub offline: bool,
    pub has_api_key: bool,
    pub investigation_config_path: Option<PathBuf>,
    pub service_name: String,
    pub service_version: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            platform_env: PlatformEnv::Dev,
            log_level: "info".to_string(),
            offline: false,
            has_api_key: false,
            investigation_config_path: None,
            service_name: "sci-lab".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl Config {
    /// Load from the process environment.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match lookup("SCI_LAB_PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("SCI_LAB_PORT must be a port number, got '{}'", raw))?,
            None => defaults.port,
        };
        let offline = match lookup("SCI_LAB_OFFLINE") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("SCI_LAB_OFFLINE must be true or false, got '{}'", raw))?,
            None => false,
        };

        let config = Self {
            port,
            platform_env: lookup("SCI_LAB_ENV").map(|v| PlatformEnv::parse(&v)).unwrap_or_default(),
            log_level: lookup("SCI_LAB_LOG_LEVEL").unwrap_or(defaults.log_level),
            offline,
            has_api_key: lookup("GOOGLE_API_KEY").is_some_and(|k| !k.trim().is_empty()),
            investigation_config_path: lookup("SCI_LAB_CONFIG").map(PathBuf::from),
            ..defaults
        };
        config.validate_for_production()?;
        Ok(config)
    }

    /// Investigation settings: config file plus environment overrides.
    pub fn investigation(&self) -> Result<InvestigationConfig> {
        InvestigationConfig::load(self.investigation_config_path.as_deref())
            .context("Failed to load investigation configuration")
    }

    /// Outside dev, a remote language model needs credentials at startup.
    pub fn validate_for_production(&self) -> Result<()> {
        if self.platform_env != PlatformEnv::Dev && !self.offline && !self.has_api_key {
            return Err(anyhow!(
                "GOOGLE_API_KEY is required in {:?} unless SCI_LAB_OFFLINE=true",
                self.platform_env
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.platform_env, PlatformEnv::Dev);
        assert!(!config.offline);
    }

    #[test]
    fn test_env_values() {
        let config = Config::from_lookup(lookup(&[
            ("SCI_LAB_PORT", "9090"),
            ("SCI_LAB_OFFLINE", "true"),
            ("SCI_LAB_LOG_LEVEL", "debug"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9090);
        assert!(config.offline);
        assert_eq!(config.log_level, "debug");

        assert!(Config::from_lookup(lookup(&[("SCI_LAB_PORT", "http")])).is_err());
    }

    #[test]
    fn test_prod_requires_credentials() {
        assert!(Config::from_lookup(lookup(&[("SCI_LAB_ENV", "prod")])).is_err());
        assert!(Config::from_lookup(lookup(&[("SCI_LAB_ENV", "prod"), ("GOOGLE_API_KEY", "k")])).is_ok());
        assert!(Config::from_lookup(lookup(&[("SCI_LAB_ENV", "prod"), ("SCI_LAB_OFFLINE", "true")])).is_ok());
    }
}
