//! Anthropic Messages API client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{RemoteInference, RemoteReply, WorkerError};
use crate::OrchestratorError;

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Messages API request payload
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [Message<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

/// Messages API response
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
    text: Option<String>,
}

/// Anthropic Claude remote inference client.
///
/// Requires an API key, read from `ANTHROPIC_API_KEY` by [`AnthropicClient::new`].
///
/// ## Example
///
/// ```no_run
/// use hybrid_layer_orchestrator::AnthropicClient;
///
/// let client = AnthropicClient::new("claude-3-5-sonnet-20241022")
///     .expect("ANTHROPIC_API_KEY set")
///     .with_max_tokens(1024);
/// ```
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    label: String,
    base_url: String,
    max_tokens: u32,
    temperature: Option<f32>,
}

impl AnthropicClient {
    /// Create a client, reading the key from `ANTHROPIC_API_KEY`.
    ///
    /// # Errors
    ///
    /// [`OrchestratorError::Configuration`] when the variable is unset or empty.
    pub fn new(model: impl Into<String>) -> Result<Self, OrchestratorError> {
        Self::from_env("ANTHROPIC_API_KEY", model)
    }

    /// Create a client, reading the key from the named environment variable.
    pub fn from_env(var: &str, model: impl Into<String>) -> Result<Self, OrchestratorError> {
        match std::env::var(var) {
            Ok(key) if !key.trim().is_empty() => Ok(Self::with_api_key(key, model)),
            _ => Err(OrchestratorError::Configuration(format!(
                "{var} environment variable not set"
            ))),
        }
    }

    /// Create a client with an explicit key.
    pub fn with_api_key(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            label: format!("anthropic/{model}"),
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            max_tokens: 1024,
            temperature: None,
        }
    }

    /// Point the client at a different endpoint (proxies, mocks).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set maximum tokens to generate
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set temperature (0.0 - 1.0)
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[async_trait]
impl RemoteInference for AnthropicClient {
    fn name(&self) -> &str {
        &self.label
    }

    async fn call(&self, prompt: &str, timeout: Duration) -> Result<RemoteReply, WorkerError> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };

        debug!(model = %self.model, "calling remote inference");
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .timeout(timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    WorkerError::Timeout(timeout)
                } else {
                    WorkerError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WorkerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                WorkerError::Timeout(timeout)
            } else {
                WorkerError::InvalidResponse(e.to_string())
            }
        })?;

        let text: String = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(WorkerError::InvalidResponse(
                "response contained no text content".to_string(),
            ));
        }

        Ok(RemoteReply {
            text,
            confidence: None,
        })
    }
}
