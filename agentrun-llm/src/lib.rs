mod error;

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

pub use error::{LlmError, Result};

/// Token cap for a handler's single completion.
pub const HANDLER_MAX_TOKENS: u32 = 500;
/// Token cap for each step of the thinking loop.
pub const THINKING_MAX_TOKENS: u32 = 300;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

/// A non-streaming chat-completion backend.
#[async_trait]
pub trait LlmClient: Send + Sync {
    fn default_model(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for any endpoint speaking the OpenAI `/chat/completions` shape.
#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
    default_model: String,
}

impl OpenAiCompatibleClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        default_model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Self::with_client(client, base_url, api_key, default_model)
    }

    /// Construct a client using a preconfigured HTTP client instance.
    pub fn with_client(
        client: Client,
        base_url: &str,
        api_key: Option<String>,
        default_model: impl Into<String>,
    ) -> Result<Self> {
        let endpoint = completions_url(base_url)?;
        Ok(Self {
            client,
            endpoint,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            default_model: default_model.into(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

fn completions_url(base_url: &str) -> Result<Url> {
    let invalid = |source| LlmError::InvalidBaseUrl {
        url: base_url.to_string(),
        source,
    };
    // Join drops the last path segment unless the base ends in a slash.
    let normalized = format!("{}/", base_url.trim_end_matches('/'));
    Url::parse(&normalized)
        .map_err(invalid)?
        .join("chat/completions")
        .map_err(invalid)
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let api_key = self.api_key.as_ref().ok_or(LlmError::MissingApiKey)?;
        debug!(
            "Requesting completion from {} with model {} ({} message(s))",
            self.endpoint,
            request.model,
            request.messages.len()
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "<unable to read body>".into());
            return Err(LlmError::Http { status, message });
        }

        let parsed: CompletionResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}
