//! Anthropic Messages API client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::llm::http::{HostedConfig, Transport};
use crate::llm::types::{split_system, CompletionOptions, Message, Role};
use crate::llm::LlmClient;

pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    config: HostedConfig,
    transport: Transport,
}

impl AnthropicClient {
    pub fn new(config: HostedConfig) -> Result<Self> {
        let transport = Transport::new("Anthropic", "ANTHROPIC_API_KEY", config.timeout_secs)?;
        Ok(Self { config, transport })
    }

    /// System messages travel in the top-level `system` field, not as turns.
    fn build_request<'a>(
        &'a self,
        messages: &'a [Message],
        options: &CompletionOptions,
    ) -> MessagesRequest<'a> {
        let (system, turns) = split_system(messages);

        MessagesRequest {
            model: &self.config.model,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            system,
            messages: turns
                .into_iter()
                .map(|m| Turn {
                    role: if m.role == Role::Assistant {
                        "assistant"
                    } else {
                        "user"
                    },
                    content: &m.content,
                })
                .collect(),
        }
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, messages: &[Message], options: &CompletionOptions) -> Result<String> {
        let request = self
            .transport
            .post(&self.config.url("messages"))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.build_request(messages, options));

        let response: MessagesResponse = self.transport.send(request).await?;
        Ok(response.text())
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Turn<'a>>,
}

#[derive(Debug, Serialize)]
struct Turn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

impl MessagesResponse {
    /// Concatenates the text blocks, skipping tool use and the like.
    fn text(&self) -> String {
        self.content
            .iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text.as_str())
            .collect()
    }
}
