//! Google Gemini client for the `generateContent` API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::llm::http::{HostedConfig, Transport};
use crate::llm::types::{split_system, CompletionOptions, Message, Role};
use crate::llm::LlmClient;

pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone)]
pub struct GeminiClient {
    config: HostedConfig,
    transport: Transport,
}

impl GeminiClient {
    pub fn new(config: HostedConfig) -> Result<Self> {
        let transport = Transport::new("Gemini", "GEMINI_API_KEY", config.timeout_secs)?;
        Ok(Self { config, transport })
    }

    fn endpoint(&self) -> String {
        self.config
            .url(&format!("models/{}:generateContent", self.config.model))
    }

    fn build_request<'a>(messages: &'a [Message], options: &CompletionOptions) -> GenerateRequest<'a> {
        let (system, turns) = split_system(messages);

        GenerateRequest {
            system_instruction: system.map(|text| SystemInstruction {
                parts: [Part { text: text.into() }],
            }),
            contents: turns
                .into_iter()
                .map(|m| Content {
                    // Gemini calls the assistant side "model".
                    role: if m.role == Role::Assistant {
                        "model"
                    } else {
                        "user"
                    },
                    parts: [Part {
                        text: m.content.as_str().into(),
                    }],
                })
                .collect(),
            generation_config: GenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_tokens,
            },
        }
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, messages: &[Message], options: &CompletionOptions) -> Result<String> {
        let request = self
            .transport
            .post(&self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&Self::build_request(messages, options));

        let response: GenerateResponse = self.transport.send(request).await?;
        Ok(response.into_text())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction<'a>>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: std::borrow::Cow<'a, str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    // absent when the candidate was blocked
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Joins the text parts of the first candidate.
    ///
    /// No candidates means an empty answer, not an error; callers decide
    /// what empty means.
    fn into_text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default()
    }
}
