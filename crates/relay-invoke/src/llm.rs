use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use relay_core::{Credential, GenerationConfig, InvocationRequest, RelayError, ReviewConfig};
use serde::{Deserialize, Serialize};

use crate::context::assemble_prompt;
use crate::retry::{post_with_retry, RetryPolicy};

/// Status and raw body of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

/// Sends one JSON POST and reports the raw outcome.
///
/// Implementations must not interpret status codes; classification and
/// retrying happen in [`post_with_retry`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` as JSON to `url` with the given extra headers.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Transport`] when no response was received.
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> Result<HttpResponse, RelayError>;
}

/// [`Transport`] backed by `reqwest`.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Transport`] if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> Result<HttpResponse, RelayError> {
        let mut request = self.client.post(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request
            .json(body)
            .send()
            .await
            .map_err(|e| RelayError::Transport(format!("request to {url} failed: {e}")))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| RelayError::Transport(format!("reading response from {url}: {e}")))?;
        Ok(HttpResponse { status, body })
    }
}

/// The single role-tagged message sent to a provider.
///
/// Every request carries exactly one user message holding the whole prompt.
///
/// # Examples
///
/// ```
/// use relay_invoke::llm::ChatMessage;
///
/// let msg = ChatMessage::user("Review this code");
/// let json = serde_json::to_value(&msg).unwrap();
/// assert_eq!(json["role"], "user");
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    role: Role,
    /// Prompt text.
    pub content: String,
}

impl ChatMessage {
    /// A user-role message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum Role {
    User,
}

#[derive(Deserialize)]
struct MessagesEnvelope {
    #[serde(default)]
    content: Vec<ContentSegment>,
}

#[derive(Deserialize)]
struct ContentSegment {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

impl MessagesEnvelope {
    /// Text of the first text segment. Segments without a `type` count as text.
    fn into_text(self) -> Option<String> {
        self.content
            .into_iter()
            .find(|s| s.kind.as_deref().map_or(true, |k| k == "text"))
            .and_then(|s| s.text)
    }
}

#[derive(Deserialize)]
struct ChatEnvelope {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for the text generation endpoint (Anthropic Messages API shape).
///
/// Sends `{ model, max_tokens, messages: [{ role: "user", content }] }` and
/// returns the text of the first text segment of the reply.
///
/// # Examples
///
/// ```
/// use relay_core::{Credential, GenerationConfig};
/// use relay_invoke::llm::GenerationClient;
///
/// let credential = Credential::new("ANTHROPIC_API_KEY", Some("test-key".into()));
/// let client = GenerationClient::new(&GenerationConfig::default(), credential).unwrap();
/// assert_eq!(client.default_model(), "claude-sonnet-4-20250514");
/// ```
pub struct GenerationClient {
    transport: Arc<dyn Transport>,
    config: GenerationConfig,
    credential: Credential,
}

impl GenerationClient {
    /// Create a client that talks HTTP through `reqwest`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: &GenerationConfig, credential: Credential) -> Result<Self, RelayError> {
        let transport = ReqwestTransport::new(Duration::from_secs(config.timeout_secs))?;
        Ok(Self::with_transport(config, credential, Arc::new(transport)))
    }

    /// Create a client over an explicit transport.
    pub fn with_transport(
        config: &GenerationConfig,
        credential: Credential,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            transport,
            config: config.clone(),
            credential,
        }
    }

    /// Model used when a request does not name one.
    pub fn default_model(&self) -> &str {
        &self.config.model
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(
            self.config.max_attempts,
            Duration::from_secs(self.config.retry_delay_secs),
        )
    }

    /// Assemble the prompt for `request`, send it, and return the reply text.
    ///
    /// # Errors
    ///
    /// - [`RelayError::MissingCredential`] before any network call when the key is unset
    /// - [`RelayError::RetriesExhausted`], [`RelayError::ApiError`],
    ///   [`RelayError::Transport`] from the retrying POST
    /// - [`RelayError::EmptyResponse`] when the reply has no text segment
    pub async fn generate(&self, request: &InvocationRequest) -> Result<String, RelayError> {
        let api_key = self.credential.require()?;
        let prompt = assemble_prompt(&request.instruction, &request.context);

        let body = serde_json::json!({
            "model": request.model,
            "max_tokens": self.config.max_tokens,
            "messages": [ChatMessage::user(prompt)],
        });
        let headers = [
            ("x-api-key", api_key),
            ("anthropic-version", self.config.api_version.as_str()),
        ];

        tracing::debug!(
            model = %request.model,
            context = request.context.len(),
            "sending generation request"
        );
        let raw = post_with_retry(
            self.transport.as_ref(),
            &self.config.endpoint,
            &headers,
            &body,
            self.retry_policy(),
        )
        .await?;

        let envelope: MessagesEnvelope = serde_json::from_str(&raw)
            .map_err(|e| RelayError::EmptyResponse(format!("undecodable response: {e}")))?;
        envelope
            .into_text()
            .ok_or_else(|| RelayError::EmptyResponse("no text segment in response".into()))
    }
}

/// OpenAI-compatible chat completions client used as the review fallback.
///
/// Works with any provider that exposes a `/v1/chat/completions` endpoint.
pub struct ChatClient {
    transport: Arc<dyn Transport>,
    config: ReviewConfig,
    credential: Credential,
}

impl ChatClient {
    /// Create a client that talks HTTP through `reqwest`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: &ReviewConfig, credential: Credential) -> Result<Self, RelayError> {
        let transport = ReqwestTransport::new(Duration::from_secs(config.timeout_secs))?;
        Ok(Self::with_transport(config, credential, Arc::new(transport)))
    }

    /// Create a client over an explicit transport.
    pub fn with_transport(
        config: &ReviewConfig,
        credential: Credential,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            transport,
            config: config.clone(),
            credential,
        }
    }

    /// Return the model name from the configuration.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send a chat completion request and return the text response.
    ///
    /// Uses temperature 0.1 and JSON response format. The credential is
    /// checked here, not at construction.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`GenerationClient::generate`].
    pub async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, RelayError> {
        let api_key = self.credential.require()?;
        let authorization = format!("Bearer {api_key}");

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": 0.1,
            "response_format": { "type": "json_object" },
        });

        let raw = post_with_retry(
            self.transport.as_ref(),
            &self.config.endpoint,
            &[("Authorization", authorization.as_str())],
            &body,
            RetryPolicy::fixed(
                self.config.max_attempts,
                Duration::from_secs(self.config.retry_delay_secs),
            ),
        )
        .await?;

        let envelope: ChatEnvelope = serde_json::from_str(&raw)
            .map_err(|e| RelayError::EmptyResponse(format!("undecodable response: {e}")))?;
        envelope
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| RelayError::EmptyResponse("no message content in response".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{Reply, ScriptedTransport};
    use relay_core::Artifact;

    fn fast_config() -> GenerationConfig {
        GenerationConfig {
            retry_delay_secs: 0,
            ..GenerationConfig::default()
        }
    }

    fn key() -> Credential {
        Credential::new("ANTHROPIC_API_KEY", Some("test-key".into()))
    }

    fn request(context: Vec<Artifact>) -> InvocationRequest {
        InvocationRequest {
            instruction: "Summarize this file".into(),
            context,
            model: "claude-test".into(),
        }
    }

    #[tokio::test]
    async fn generate_returns_first_text_segment() {
        let transport = Arc::new(ScriptedTransport::new(vec![Reply::status(
            200,
            r#"{"content":[{"text":"Summary: a greeting"}]}"#,
        )]));
        let client = GenerationClient::with_transport(&fast_config(), key(), transport.clone());
        let out = client
            .generate(&request(vec![Artifact::new("hello.txt", "hello world")]))
            .await
            .unwrap();
        assert_eq!(out, "Summary: a greeting");

        let body = &transport.bodies()[0];
        assert_eq!(body["model"], "claude-test");
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["messages"][0]["role"], "user");
        let content = body["messages"][0]["content"].as_str().unwrap();
        assert!(content.contains("## hello.txt"));
        assert!(content.contains("hello world"));

        let headers = &transport.headers()[0];
        assert!(headers.contains(&("x-api-key".into(), "test-key".into())));
    }

    #[tokio::test]
    async fn generate_skips_non_text_segments() {
        let transport = Arc::new(ScriptedTransport::new(vec![Reply::status(
            200,
            r#"{"content":[{"type":"thinking","thinking":"hmm"},{"type":"text","text":"done"}]}"#,
        )]));
        let client = GenerationClient::with_transport(&fast_config(), key(), transport);
        assert_eq!(client.generate(&request(vec![])).await.unwrap(), "done");
    }

    #[tokio::test]
    async fn missing_credential_fails_before_network() {
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let client = GenerationClient::with_transport(
            &fast_config(),
            Credential::new("ANTHROPIC_API_KEY", None),
            transport.clone(),
        );
        let err = client.generate(&request(vec![])).await.unwrap_err();
        assert!(matches!(err, RelayError::MissingCredential { .. }));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn envelope_without_text_is_empty_response() {
        let transport = Arc::new(ScriptedTransport::new(vec![Reply::status(
            200,
            r#"{"content":[]}"#,
        )]));
        let client = GenerationClient::with_transport(&fast_config(), key(), transport.clone());
        let err = client.generate(&request(vec![])).await.unwrap_err();
        assert!(matches!(err, RelayError::EmptyResponse(_)));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn garbage_body_is_empty_response() {
        let transport = Arc::new(ScriptedTransport::new(vec![Reply::status(200, "<html>")]));
        let client = GenerationClient::with_transport(&fast_config(), key(), transport);
        let err = client.generate(&request(vec![])).await.unwrap_err();
        assert!(matches!(err, RelayError::EmptyResponse(_)));
    }

    #[tokio::test]
    async fn rate_limit_then_success() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Reply::status(429, ""),
            Reply::status(200, r#"{"content":[{"type":"text","text":"ok"}]}"#),
        ]));
        let client = GenerationClient::with_transport(&fast_config(), key(), transport.clone());
        assert_eq!(client.generate(&request(vec![])).await.unwrap(), "ok");
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn chat_extracts_first_choice_with_bearer_auth() {
        let transport = Arc::new(ScriptedTransport::new(vec![Reply::status(
            200,
            r#"{"choices":[{"message":{"role":"assistant","content":"{\"ok\":true}"}}]}"#,
        )]));
        let config = ReviewConfig {
            retry_delay_secs: 0,
            ..ReviewConfig::default()
        };
        let client = ChatClient::with_transport(
            &config,
            Credential::new("OPENAI_API_KEY", Some("sk-test".into())),
            transport.clone(),
        );
        let out = client.chat(vec![ChatMessage::user("review")]).await.unwrap();
        assert_eq!(out, "{\"ok\":true}");

        let body = &transport.bodies()[0];
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["response_format"]["type"], "json_object");
        let headers = &transport.headers()[0];
        assert!(headers.contains(&("Authorization".into(), "Bearer sk-test".into())));
    }

    #[tokio::test]
    async fn chat_without_choices_is_empty_response() {
        let transport = Arc::new(ScriptedTransport::new(vec![Reply::status(
            200,
            r#"{"choices":[]}"#,
        )]));
        let client = ChatClient::with_transport(
            &ReviewConfig::default(),
            Credential::new("OPENAI_API_KEY", Some("sk-test".into())),
            transport,
        );
        let err = client.chat(vec![ChatMessage::user("x")]).await.unwrap_err();
        assert!(matches!(err, RelayError::EmptyResponse(_)));
    }

    #[test]
    fn chat_message_serializes() {
        let msg = ChatMessage::user("hello");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "hello");
    }
}
