//! Chat-completion client for link curation.
//!
//! The curator talks to the model through [`CompletionClient`] so tests can
//! script replies. [`OpenAiClient`] is the production implementation against
//! any OpenAI-compatible `/chat/completions` endpoint.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use brochurekit_shared::{BrochureKitError, LlmConfig, Result};

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// One chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
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

/// A single-shot text-generation backend.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send `messages` and return the trimmed reply text.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Model identifier, for logs and summaries.
    fn model(&self) -> &str;
}

// ---------------------------------------------------------------------------
// OpenAI-compatible client
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatResponseRaw {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Bearer-authenticated client for `POST {base_url}/chat/completions`.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http_client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    /// Build a client from `[llm]` settings and an already-resolved key.
    pub fn new(api_key: impl Into<String>, config: &LlmConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| BrochureKitError::config(format!("failed to build model client: {e}")))?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    /// Override the model configured in `[llm]`.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let start = Instant::now();
        let request = ChatRequest {
            model: &self.model,
            messages,
        };

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "model request failed");
                BrochureKitError::Llm(format!("request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, error = %body, "model API error");
            return Err(BrochureKitError::Llm(format!("API returned {status}: {body}")));
        }

        let raw: ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| BrochureKitError::Llm(format!("unreadable response envelope: {e}")))?;

        let content = raw
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| BrochureKitError::Llm("response has no message content".into()))?;

        debug!(
            model = %self.model,
            duration_ms = start.elapsed().as_millis() as u64,
            "chat completion"
        );

        Ok(content.trim().to_string())
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> OpenAiClient {
        let config = LlmConfig {
            base_url: format!("{}/v1/", server.uri()),
            ..LlmConfig::default()
        };
        OpenAiClient::new("test-key", &config).unwrap()
    }

    #[tokio::test]
    async fn complete_returns_trimmed_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "messages": [{"role": "system", "content": "pick"}, {"role": "user", "content": "{}"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "  {\"links\": []}\n"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client_for(&server)
            .complete(&[ChatMessage::system("pick"), ChatMessage::user("{}")])
            .await
            .unwrap();
        assert_eq!(reply, r#"{"links": []}"#);
    }

    #[tokio::test]
    async fn api_error_status_is_llm_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .complete(&[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        match err {
            BrochureKitError::Llm(msg) => {
                assert!(msg.contains("401"));
                assert!(msg.contains("invalid api key"));
            }
            other => panic!("expected Llm, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_choices_is_llm_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .complete(&[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, BrochureKitError::Llm(_)));
    }

    #[test]
    fn with_model_overrides_config() {
        let client = OpenAiClient::new("k", &LlmConfig::default())
            .unwrap()
            .with_model("gpt-4o");
        assert_eq!(client.model(), "gpt-4o");
    }
}
