use std::time::Duration;

use crate::error::Result;
use crate::openai::types::{ChatRequest, WireMessage};
use crate::openai::OpenAi;
use crate::message::{Completion, Message};

const PERPLEXITY_API_URL: &str = "https://api.perplexity.ai";

/// Perplexity's OpenAI-compatible chat API, with citations requested on every call.
#[derive(Clone)]
pub struct Perplexity {
    inner: OpenAi,
}

impl Perplexity {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            inner: OpenAi::new(api_key, model).with_base_url(PERPLEXITY_API_URL),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.inner = self.inner.with_base_url(url);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.inner = self.inner.with_timeout(timeout);
        self
    }

    pub fn model(&self) -> &str {
        self.inner.model()
    }

    /// One research turn over the whole conversation so far.
    pub async fn research(&self, messages: &[Message]) -> Result<Completion> {
        let request = ChatRequest::new(self.inner.model())
            .messages(messages.iter().map(WireMessage::from))
            .with_citations();
        self.inner.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn research_sends_citation_flags_and_returns_citations() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({
                "model": "sonar-reasoning-pro",
                "return_citations": true,
                "return_images": false,
                "stream": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "findings"}}],
                "citations": ["https://a.example", "https://b.example"]
            })))
            .mount(&server)
            .await;

        let p = Perplexity::new("pplx", "sonar-reasoning-pro").with_base_url(server.uri());
        let completion = p
            .research(&[Message::system("s"), Message::user("u")])
            .await
            .unwrap();
        assert_eq!(completion.content, "findings");
        assert_eq!(completion.citations.len(), 2);
    }
}
