use async_trait::async_trait;
use relay_core::{Credential, RelayError, ReviewConfig, ReviewResult};

use crate::cli::CliReviewer;
use crate::llm::{ChatClient, ChatMessage};
use crate::normalize::parse_review_result;
use crate::prompt::build_review_prompt;

/// One way of turning a review prompt into raw reviewer output.
///
/// A failure is recoverable from the runner's point of view: the next
/// strategy in line is tried.
#[async_trait]
pub trait ReviewStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Produce raw output for `prompt`.
    async fn review(&self, prompt: &str) -> Result<String, RelayError>;
}

/// Review by calling the provider's chat completions endpoint directly.
pub struct HttpReviewer {
    client: ChatClient,
}

impl HttpReviewer {
    /// Wrap a chat client.
    pub fn new(client: ChatClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReviewStrategy for HttpReviewer {
    fn name(&self) -> &str {
        "http"
    }

    async fn review(&self, prompt: &str) -> Result<String, RelayError> {
        tracing::debug!(model = self.client.model(), "requesting review over HTTP");
        self.client.chat(vec![ChatMessage::user(prompt)]).await
    }
}

/// Runs review strategies in a fixed order and normalizes the first output.
///
/// The default order is the local CLI tool, then the HTTP fallback. Which
/// strategy produced the output does not affect the result.
///
/// # Examples
///
/// ```
/// use relay_core::{Credential, ReviewConfig};
/// use relay_invoke::review::ReviewRunner;
///
/// let credential = Credential::new("OPENAI_API_KEY", None);
/// let runner = ReviewRunner::from_config(&ReviewConfig::default(), credential).unwrap();
/// assert_eq!(runner.strategy_names(), vec!["codex", "http"]);
/// ```
pub struct ReviewRunner {
    strategies: Vec<Box<dyn ReviewStrategy>>,
}

impl ReviewRunner {
    /// Runner over an explicit strategy list, tried front to back.
    pub fn new(strategies: Vec<Box<dyn ReviewStrategy>>) -> Self {
        Self { strategies }
    }

    /// CLI tool first, HTTP fallback second.
    ///
    /// The fallback credential is only demanded if the fallback runs.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Transport`] if the HTTP client cannot be built.
    pub fn from_config(config: &ReviewConfig, credential: Credential) -> Result<Self, RelayError> {
        let cli = CliReviewer::from_config(config);
        let http = HttpReviewer::new(ChatClient::new(config, credential)?);
        Ok(Self::new(vec![Box::new(cli), Box::new(http)]))
    }

    /// Names of the configured strategies, in order.
    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Review `content` and return the normalized result.
    ///
    /// # Errors
    ///
    /// - [`RelayError::EmptyInput`] if `content` is blank
    /// - the last strategy's error if every strategy fails
    /// - [`RelayError::UnparsableResult`] if the output cannot be normalized
    pub async fn run(&self, content: &str) -> Result<ReviewResult, RelayError> {
        if content.trim().is_empty() {
            return Err(RelayError::EmptyInput(
                "no files or diff to review".into(),
            ));
        }
        let prompt = build_review_prompt(content);
        let raw = self.obtain(&prompt).await?;
        parse_review_result(&raw)
    }

    /// Try each strategy until one yields non-empty output.
    async fn obtain(&self, prompt: &str) -> Result<String, RelayError> {
        let mut last_error = None;
        for strategy in &self.strategies {
            match strategy.review(prompt).await {
                Ok(raw) if !raw.trim().is_empty() => {
                    tracing::debug!(strategy = strategy.name(), "review output obtained");
                    return Ok(raw);
                }
                Ok(_) => {
                    tracing::warn!(strategy = strategy.name(), "review path returned no output");
                    last_error = Some(RelayError::EmptyResponse(format!(
                        "{} returned no output",
                        strategy.name()
                    )));
                }
                Err(e) => {
                    tracing::warn!(strategy = strategy.name(), error = %e, "review path failed");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error
            .unwrap_or_else(|| RelayError::Config("no review strategies configured".into())))
    }
}
