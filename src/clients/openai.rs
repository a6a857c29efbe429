pub mod models;

use crate::config::KeyFromEnv;
use crate::core::{ChatStreamClient, RawByteStream};
use crate::error::ChatError;
use async_trait::async_trait;
use futures_util::StreamExt;
use models::{ChatMessage, ChatRequest, OpenAIModel};
use reqwest::Client;
use tracing::{debug, error, info, instrument, warn};

pub const DEFAULT_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub model: OpenAIModel,
    pub endpoint: String,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: OpenAIModel::default(),
            endpoint: DEFAULT_CHAT_URL.to_string(),
        }
    }
}

impl OpenAIConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), ..Default::default() }
    }

    #[must_use]
    pub fn with_model(mut self, model: OpenAIModel) -> Self {
        self.model = model;
        self
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Clone, Debug)]
pub struct OpenAIClient {
    config: OpenAIConfig,
    http: Client,
}

impl KeyFromEnv for OpenAIClient {
    const KEY_NAME: &'static str = "OPENAI_API_KEY";
}

impl OpenAIClient {
    pub fn new(config: OpenAIConfig) -> Self {
        info!(model = %config.model.id(), "Creating new OpenAI client");
        Self { config, http: Client::new() }
    }

    pub fn model(&self) -> &OpenAIModel {
        &self.config.model
    }

    fn request_body(&self, messages: Vec<ChatMessage>) -> ChatRequest {
        ChatRequest {
            model: self.config.model.id().to_string(),
            messages,
            stream: true,
        }
    }
}

#[async_trait]
impl ChatStreamClient for OpenAIClient {
    #[instrument(skip(self, messages), fields(model = %self.config.model.id(), messages = messages.len()))]
    async fn open_stream(&self, messages: Vec<ChatMessage>) -> Result<RawByteStream, ChatError> {
        let body = self.request_body(messages);

        debug!("Sending streaming request to chat API");
        let resp = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP request failed");
                ChatError::Http(e.to_string())
            })?;

        let status = resp.status();
        debug!(status = %status, "Received response from chat API");

        if status == 401 {
            error!("Chat API authentication failed");
            return Err(ChatError::Authentication);
        }
        if status == 429 {
            warn!("Chat API rate limit exceeded");
            return Err(ChatError::RateLimit);
        }
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %txt, "Chat API error");
            return Err(ChatError::Api { status: status.as_u16(), body: txt });
        }
        if resp.content_length() == Some(0) {
            error!("Chat API answered without a body");
            return Err(ChatError::EmptyBody);
        }

        Ok(Box::pin(
            resp.bytes_stream()
                .map(|chunk| chunk.map_err(|e| ChatError::Http(e.to_string()))),
        ))
    }
}
