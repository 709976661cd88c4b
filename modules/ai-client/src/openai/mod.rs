mod client;
pub(crate) mod types;

use std::time::Duration;

use tracing::debug;

use crate::error::{AiError, Result};
use crate::message::{Completion, Message};
use crate::util::image_data_url;

pub(crate) use client::{http_client, ChatClient};
use types::{ChatRequest, WireMessage};

const OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// Total per-request timeout unless overridden with `with_timeout`.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

// =============================================================================
// OpenAi Agent
// =============================================================================

#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    pub(crate) model: String,
    base_url: Option<String>,
    http: reqwest::Client,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            http: http_client(DEFAULT_TIMEOUT),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = http_client(timeout);
        self
    }

    /// Same credentials and transport, different model.
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..self.clone()
        }
    }

    /// Get the model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub(crate) fn client(&self) -> ChatClient {
        ChatClient::new(
            &self.api_key,
            self.base_url.as_deref().unwrap_or(OPENAI_API_URL),
            self.http.clone(),
        )
    }

    // =========================================================================
    // Convenience methods
    // =========================================================================

    /// Single user prompt at temperature 0, for short selection answers.
    pub async fn pick(&self, prompt: impl Into<String>) -> Result<String> {
        let request = ChatRequest::new(&self.model)
            .message(WireMessage::user(prompt))
            .temperature(0.0);
        self.send(request).await.map(|c| c.content.trim().to_string())
    }

    /// Multi-message chat. Fails with `Validation` when the response has no content.
    pub async fn chat(&self, messages: &[Message]) -> Result<Completion> {
        let request = ChatRequest::new(&self.model).messages(messages.iter().map(WireMessage::from));
        self.send(request).await
    }

    /// Ask a vision-capable model about an inline image.
    pub async fn describe_image(
        &self,
        prompt: impl Into<String>,
        image: &[u8],
        max_tokens: u32,
    ) -> Result<String> {
        let request = ChatRequest::new(&self.model)
            .message(WireMessage::user_with_image(
                prompt,
                image_data_url(image, "image/jpeg"),
            ))
            .token_limit(max_tokens);
        self.send(request).await.map(|c| c.content.trim().to_string())
    }

    pub(crate) async fn send(&self, request: ChatRequest) -> Result<Completion> {
        let response = self.client().chat(&request).await?;
        let citations = response.citations.clone();
        let content = response.first_content().ok_or_else(|| {
            AiError::Validation("response has no choices[0].message.content".into())
        })?;
        debug!(model = %self.model, chars = content.len(), citations = citations.len(), "Chat response");
        Ok(Completion { content, citations })
    }
}
