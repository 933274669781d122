//! LLM client factory.
//!
//! Centralizes provider-specific logic for creating LLM clients.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::LlmConfig;
use crate::error::{InsightError, Result};
use crate::llm::anthropic::ANTHROPIC_API_URL;
use crate::llm::gemini::GEMINI_API_URL;
use crate::llm::openai::OPENAI_API_URL;
use crate::llm::{
    AnthropicClient, GeminiClient, HostedConfig, LlmClient, LlmProvider, MockLlmClient,
    OpenAiClient, UnavailableLlmClient,
};

/// Creates the configured client, or a stand-in that reports why none exists.
///
/// A missing key or unknown provider does not stop the process; every
/// question then fails at generation with the model reported unavailable.
pub fn client_from_config(config: &LlmConfig) -> Arc<dyn LlmClient> {
    let client = config
        .provider()
        .and_then(|provider| create_client(provider, config).map(|c| (provider, c)));

    match client {
        Ok((provider, client)) => {
            info!(
                provider = %provider,
                model = %config.model_for(provider),
                "Language model configured"
            );
            client
        }
        Err(e) => {
            warn!("Language model unavailable: {e}");
            let reason = match e {
                InsightError::Llm(msg) | InsightError::Config(msg) => msg,
                other => other.to_string(),
            };
            Arc::new(UnavailableLlmClient::new(reason))
        }
    }
}

/// Creates an LLM client for the given provider.
///
/// The API key is resolved from the provider's environment variables first
/// (`GEMINI_API_KEY`, `OPENAI_API_KEY`, `ANTHROPIC_API_KEY`), then from the
/// `[llm] api_key` setting. The model falls back to the provider default.
pub fn create_client(provider: LlmProvider, config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    create_client_with_key(provider, config, config.api_key_for(provider))
}

/// Creates a client with an already resolved API key.
pub fn create_client_with_key(
    provider: LlmProvider,
    config: &LlmConfig,
    api_key: Option<String>,
) -> Result<Arc<dyn LlmClient>> {
    let model = config.model_for(provider);

    let hosted = |default_base_url: &str| -> Result<HostedConfig> {
        let api_key = api_key.ok_or_else(|| {
            InsightError::llm(format!(
                "No API key configured for {provider}. Set {} or [llm] api_key.",
                provider.api_key_vars().join(" or ")
            ))
        })?;
        let base_url = config.base_url.as_deref().unwrap_or(default_base_url);
        Ok(HostedConfig::new(api_key, model.clone(), base_url).with_timeout(config.timeout_secs))
    };

    let client: Arc<dyn LlmClient> = match provider {
        LlmProvider::Gemini => Arc::new(GeminiClient::new(hosted(GEMINI_API_URL)?)?),
        LlmProvider::OpenAi => Arc::new(OpenAiClient::new(hosted(OPENAI_API_URL)?)?),
        LlmProvider::Anthropic => Arc::new(AnthropicClient::new(hosted(ANTHROPIC_API_URL)?)?),
        LlmProvider::Mock => Arc::new(MockLlmClient::new()),
    };
    Ok(client)
}
