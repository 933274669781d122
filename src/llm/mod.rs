//! LLM integration for shopinsight.
//!
//! Provides the client trait and implementations for the supported
//! providers. One client instance is shared by every request.

pub mod anthropic;
pub mod factory;
pub mod gemini;
pub mod http;
pub mod mock;
pub mod openai;
pub mod parser;
pub mod prompt;
pub mod types;

pub use anthropic::AnthropicClient;
pub use factory::{client_from_config, create_client};
pub use gemini::GeminiClient;
pub use http::HostedConfig;
pub use mock::MockLlmClient;
pub use openai::OpenAiClient;
pub use parser::strip_code_fence;
pub use prompt::{build_summary_prompt, PromptBuilder, PromptPair, SUMMARY_SYSTEM_PROMPT};
pub use types::{CompletionOptions, Message, Role};

use async_trait::async_trait;
use std::str::FromStr;

use crate::error::{InsightError, Result};

/// A language model that turns a conversation into one text reply.
///
/// Shared across concurrent requests behind an `Arc`.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Returns the reply text. Empty text is a valid reply.
    async fn complete(&self, messages: &[Message], options: &CompletionOptions)
        -> Result<String>;

    /// Returns false when no usable provider is behind this client.
    fn is_configured(&self) -> bool {
        true
    }
}

/// Stand-in used when no provider could be configured.
///
/// Every call fails with the reason given at startup, so requests report the
/// model as unavailable instead of the process refusing to start.
#[derive(Debug, Clone)]
pub struct UnavailableLlmClient {
    reason: String,
}

impl UnavailableLlmClient {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[async_trait]
impl LlmClient for UnavailableLlmClient {
    async fn complete(&self, _: &[Message], _: &CompletionOptions) -> Result<String> {
        Err(InsightError::llm(self.reason.clone()))
    }

    fn is_configured(&self) -> bool {
        false
    }
}

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProvider {
    /// Google Gemini
    #[default]
    Gemini,
    /// OpenAI (GPT-4o, etc.)
    OpenAi,
    /// Anthropic (Claude)
    Anthropic,
    /// Deterministic offline client
    Mock,
}

impl LlmProvider {
    /// Name used in config files and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Mock => "mock",
        }
    }

    /// Model used when the configuration names none.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini-2.5-flash",
            Self::OpenAi => "gpt-4o",
            Self::Anthropic => "claude-sonnet-4-20250514",
            Self::Mock => "mock",
        }
    }

    /// Environment variables consulted for the API key, in order.
    pub fn api_key_vars(&self) -> &'static [&'static str] {
        match self {
            Self::Gemini => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
            Self::OpenAi => &["OPENAI_API_KEY"],
            Self::Anthropic => &["ANTHROPIC_API_KEY"],
            Self::Mock => &[],
        }
    }

    pub fn requires_api_key(&self) -> bool {
        !self.api_key_vars().is_empty()
    }
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "mock" => Ok(Self::Mock),
            _ => Err(format!(
                "Unknown LLM provider: {s} (expected gemini, openai, anthropic or mock)"
            )),
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
