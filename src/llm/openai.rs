//! OpenAI chat completions client.
//!
//! Also works against OpenAI-compatible servers through `[llm] base_url`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::llm::http::{HostedConfig, Transport};
use crate::llm::types::{CompletionOptions, Message};
use crate::llm::LlmClient;

pub const OPENAI_API_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    config: HostedConfig,
    transport: Transport,
}

impl OpenAiClient {
    pub fn new(config: HostedConfig) -> Result<Self> {
        let transport = Transport::new("OpenAI", "OPENAI_API_KEY", config.timeout_secs)?;
        Ok(Self { config, transport })
    }

    fn build_request<'a>(&'a self, messages: &'a [Message], options: &CompletionOptions) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages: messages
                .iter()
                .map(|m| ChatMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, messages: &[Message], options: &CompletionOptions) -> Result<String> {
        let request = self
            .transport
            .post(&self.config.url("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&self.build_request(messages, options));

        let response: ChatResponse = self.transport.send(request).await?;
        Ok(response.into_text())
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    // null when the model only called tools or was filtered
    content: Option<String>,
}

impl ChatResponse {
    fn into_text(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OpenAiClient {
        OpenAiClient::new(HostedConfig::new("sk-test", "gpt-4o", OPENAI_API_URL)).unwrap()
    }

    #[test]
    fn test_request_body() {
        let client = client();
        let messages = vec![
            Message::system("You are an expert data analyst."),
            Message::user("Question: total sales?"),
        ];

        let request = client.build_request(&messages, &CompletionOptions::new(0.3, 300));
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "Question: total sales?");
        assert_eq!(json["max_tokens"], 300);
        assert!((json["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(
            client().config.url("chat/completions"),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_first_choice_text() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"SELECT 1"}},{"message":{"content":"SELECT 2"}}]}"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.into_text(), "SELECT 1");
    }

    #[test]
    fn test_null_or_missing_content_is_empty() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.into_text(), "");

        let response: ChatResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(response.into_text(), "");
    }
}
