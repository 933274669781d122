//! Transport shared by the hosted model providers.
//!
//! Gemini, OpenAI and Anthropic differ in wire format only. Connection
//! setup, status handling and error bodies (`{"error": {"message": ...}}`
//! for all three) live here.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::error::{InsightError, Result};

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Credentials and endpoint for one hosted provider.
#[derive(Debug, Clone)]
pub struct HostedConfig {
    pub api_key: String,
    pub model: String,
    /// Base URL without the provider-specific path.
    pub base_url: String,
    pub timeout_secs: u64,
}

impl HostedConfig {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Points the client at a different endpoint (proxies, compatible servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Joins `path` onto the base URL.
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// A pooled HTTP client labelled with the provider it talks to.
#[derive(Debug, Clone)]
pub(crate) struct Transport {
    client: Client,
    provider: &'static str,
    key_var: &'static str,
}

impl Transport {
    pub(crate) fn new(provider: &'static str, key_var: &'static str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| InsightError::llm(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            provider,
            key_var,
        })
    }

    pub(crate) fn post(&self, url: &str) -> RequestBuilder {
        self.client.post(url)
    }

    /// Sends a prepared request and decodes a successful JSON body.
    pub(crate) async fn send<R: DeserializeOwned>(&self, request: RequestBuilder) -> Result<R> {
        debug!(provider = self.provider, "Sending completion request");

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                InsightError::timeout(format!("{} request timed out", self.provider))
            } else if e.is_connect() {
                InsightError::llm(format!(
                    "Failed to connect to {} API. Check your network.",
                    self.provider
                ))
            } else {
                InsightError::llm(format!("Request failed: {e}"))
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| InsightError::llm(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(self.api_error(status, &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| InsightError::llm(format!("Failed to parse {} response: {e}", self.provider)))
    }

    /// Turns a non-success response into an error message.
    pub(crate) fn api_error(&self, status: StatusCode, body: &str) -> InsightError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => InsightError::llm(format!(
                "Authentication failed. Check your {}.",
                self.key_var
            )),
            StatusCode::TOO_MANY_REQUESTS => {
                InsightError::llm("Rate limited. Please wait and try again.")
            }
            _ => match serde_json::from_str::<ErrorBody>(body) {
                Ok(parsed) => {
                    InsightError::llm(format!("{} API error: {}", self.provider, parsed.error.message))
                }
                Err(_) => InsightError::llm(format!("{} API error ({status}): {body}", self.provider)),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}
