//! Configuration management for shopinsight.
//!
//! Settings come from a TOML file, environment variables and command-line
//! flags. Precedence, highest first: CLI > environment > file > defaults.

use crate::catalog::SchemaCatalog;
use crate::db::DatabaseBackend;
use crate::error::{InsightError, Result};
use crate::llm::{CompletionOptions, LlmProvider};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Main configuration structure for shopinsight.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Replaces the built-in schema catalog when present.
    #[serde(default)]
    pub catalog: Option<SchemaCatalog>,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "0.0.0.0:5000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl ServerConfig {
    /// Parses the bind address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind
            .parse()
            .map_err(|e| InsightError::config(format!("Invalid bind address '{}': {e}", self.bind)))
    }
}

/// Metrics store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `postgres://`, `postgresql://` or `sqlite:` URL.
    #[serde(default = "default_database_url")]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Upper bound on a single statement's runtime.
    #[serde(default = "default_statement_timeout_secs")]
    pub statement_timeout_secs: u64,
}

fn default_database_url() -> String {
    "sqlite://ecommerce_ai.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_statement_timeout_secs() -> u64 {
    30
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            statement_timeout_secs: default_statement_timeout_secs(),
        }
    }
}

impl DatabaseConfig {
    /// Creates a config for the given URL with default limits.
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Returns the backend selected by the URL scheme.
    pub fn backend(&self) -> Result<DatabaseBackend> {
        DatabaseBackend::from_url(&self.url)
    }

    pub fn statement_timeout(&self) -> Duration {
        Duration::from_secs(self.statement_timeout_secs)
    }

    /// Returns the URL with any password replaced, for logs and the CLI.
    pub fn display_string(&self) -> String {
        match Url::parse(&self.url) {
            Ok(mut url) if url.password().is_some() => {
                // set_password only fails for URLs that cannot carry credentials
                let _ = url.set_password(Some("***"));
                url.to_string()
            }
            _ => self.url.clone(),
        }
    }
}

/// Sampling parameters for one kind of model call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl SamplingConfig {
    pub fn options(&self) -> CompletionOptions {
        CompletionOptions::new(self.temperature, self.max_tokens)
    }
}

fn default_generation() -> SamplingConfig {
    SamplingConfig {
        temperature: 0.1,
        max_tokens: 500,
    }
}

fn default_summary() -> SamplingConfig {
    SamplingConfig {
        temperature: 0.3,
        max_tokens: 300,
    }
}

/// Language-model provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "gemini", "openai", "anthropic" or "mock".
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model name; each provider has its own default.
    #[serde(default)]
    pub model: Option<String>,

    /// API key. The provider's environment variable takes precedence.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Overrides the provider's API endpoint.
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_generation")]
    pub generation: SamplingConfig,

    #[serde(default = "default_summary")]
    pub summary: SamplingConfig,
}

fn default_provider() -> String {
    "gemini".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    30
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            api_key: None,
            base_url: None,
            timeout_secs: default_llm_timeout_secs(),
            generation: default_generation(),
            summary: default_summary(),
        }
    }
}

impl LlmConfig {
    /// Parses the configured provider.
    pub fn provider(&self) -> Result<LlmProvider> {
        self.provider.parse().map_err(InsightError::config)
    }

    /// Returns the configured model or the provider default.
    pub fn model_for(&self, provider: LlmProvider) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| provider.default_model().to_string())
    }

    /// Resolves the API key for a provider: environment first, then file.
    pub fn api_key_for(&self, provider: LlmProvider) -> Option<String> {
        self.api_key_with(provider, |name| std::env::var(name).ok())
    }

    fn api_key_with(
        &self,
        provider: LlmProvider,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Option<String> {
        provider
            .api_key_vars()
            .iter()
            .find_map(|var| lookup(var).filter(|v| !v.trim().is_empty()))
            .or_else(|| self.api_key.clone().filter(|v| !v.trim().is_empty()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Logging destination.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log file; stderr when unset.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shopinsight")
            .join("config.toml")
    }

    /// Loads the configuration file, then applies environment overrides.
    ///
    /// An explicitly given path must exist; a missing default file yields
    /// the defaults. Callers validate after applying command-line overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) if !p.exists() => {
                return Err(InsightError::config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            Some(p) => Self::load_from_file(p)?,
            None => Self::load_from_file(&Self::default_path())?,
        };
        config.apply_env();
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| InsightError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            InsightError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Applies `DATABASE_URL`, `LLM_PROVIDER` and `LLM_MODEL`.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|name| std::env::var(name).ok());
    }

    fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("DATABASE_URL").filter(|v| !v.is_empty()) {
            self.database.url = url;
        }
        if let Some(provider) = lookup("LLM_PROVIDER").filter(|v| !v.is_empty()) {
            self.llm.provider = provider;
        }
        if let Some(model) = lookup("LLM_MODEL").filter(|v| !v.is_empty()) {
            self.llm.model = Some(model);
        }
    }

    /// Checks values that would otherwise fail late.
    pub fn validate(&self) -> Result<()> {
        self.server.socket_addr()?;
        self.database.backend()?;
        self.llm.provider()?;

        if self.database.statement_timeout_secs == 0 {
            return Err(InsightError::config(
                "database.statement_timeout_secs must be greater than zero",
            ));
        }
        if self.database.max_connections == 0 {
            return Err(InsightError::config(
                "database.max_connections must be greater than zero",
            ));
        }
        if self.llm.timeout_secs == 0 {
            return Err(InsightError::config(
                "llm.timeout_secs must be greater than zero",
            ));
        }
        for (name, sampling) in [("generation", &self.llm.generation), ("summary", &self.llm.summary)]
        {
            if !(0.0..=2.0).contains(&sampling.temperature) {
                return Err(InsightError::config(format!(
                    "llm.{name}.temperature must be between 0 and 2"
                )));
            }
            if sampling.max_tokens == 0 {
                return Err(InsightError::config(format!(
                    "llm.{name}.max_tokens must be greater than zero"
                )));
            }
        }
        if let Some(catalog) = &self.catalog {
            catalog.validate()?;
        }

        Ok(())
    }

    /// Returns the configured catalog, or the built-in one.
    pub fn catalog(&self) -> SchemaCatalog {
        self.catalog.clone().unwrap_or_default()
    }
}
