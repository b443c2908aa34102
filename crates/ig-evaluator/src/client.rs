// client.rs - Text-generation client for OpenAI-compatible chat completions.
//
// The evaluator only needs "messages in, text out", so the service sits
// behind the `TextGenerator` trait. `ChatCompletionsClient` is the real
// implementation (Cerebras by default); tests substitute their own.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::error::{EvaluatorError, GeneratorError};

/// One chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Produces a reply for a conversation.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, GeneratorError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    /// Content can be null when the provider refuses or errors.
    #[serde(default)]
    content: Option<String>,
}

/// Longest error body kept for logs.
const MAX_ERROR_BODY: usize = 300;

/// `POST {endpoint}` with a bearer key, OpenAI chat-completions shape.
pub struct ChatCompletionsClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    temperature: f32,
    max_tokens: u32,
}

impl ChatCompletionsClient {
    /// Build a client from config. Fails with `MissingApiKey` when neither
    /// the inline key nor the environment variable is set.
    pub fn from_config(config: &ModelConfig) -> Result<Self, GeneratorError> {
        let api_key = config
            .resolve_api_key()
            .ok_or_else(|| GeneratorError::MissingApiKey(config.api_key_env.clone()))?;
        Self::new(config, api_key).map_err(|e| match e {
            EvaluatorError::Client(source) => GeneratorError::Transport(source),
            other => GeneratorError::Malformed(other.to_string()),
        })
    }

    /// Build a client with an explicit key.
    ///
    /// The HTTP client carries its own request timeout (the evaluator's
    /// bound plus a second) as a backstop behind the evaluator's timer.
    pub fn new(config: &ModelConfig, api_key: String) -> Result<Self, EvaluatorError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout() + Duration::from_secs(1))
            .build()
            .map_err(EvaluatorError::Client)?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TextGenerator for ChatCompletionsClient {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, GeneratorError> {
        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let mut text = response.text().await.unwrap_or_default();
            if text.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !text.is_char_boundary(cut) {
                    cut -= 1;
                }
                text.truncate(cut);
            }
            return Err(GeneratorError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GeneratorError::Malformed(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| GeneratorError::Malformed("no message content in reply".to_string()))
    }
}
