use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// Top-level configuration loaded from `.relay.toml`.
///
/// Supports layered resolution: CLI flags > config file > defaults. Every
/// field has a default, so an empty file is a valid configuration.
///
/// # Examples
///
/// ```
/// use relay_core::RelayConfig;
///
/// let config = RelayConfig::default();
/// assert_eq!(config.generation.max_attempts, 3);
/// assert_eq!(config.review.program, "codex");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Generation endpoint settings.
    #[serde(default)]
    pub generation: GenerationConfig,
    /// Review tool and fallback endpoint settings.
    #[serde(default)]
    pub review: ReviewConfig,
}

impl RelayConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Io`] if the file cannot be read, or
    /// [`RelayError::Toml`] if the content is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, RelayError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use relay_core::RelayConfig;
    ///
    /// let toml = r#"
    /// [generation]
    /// model = "claude-3-5-haiku-20241022"
    /// "#;
    /// let config = RelayConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.generation.model, "claude-3-5-haiku-20241022");
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, RelayError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

/// Settings for the text generation provider (Anthropic Messages API shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Full URL of the messages endpoint.
    #[serde(default = "default_generation_endpoint")]
    pub endpoint: String,
    /// Model identifier used when `--model` is not given.
    #[serde(default = "default_generation_model")]
    pub model: String,
    /// Maximum output tokens requested per call.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Environment variable holding the API key.
    #[serde(default = "default_generation_key_env")]
    pub api_key_env: String,
    /// Value of the `anthropic-version` header.
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Attempts made while the provider answers 429.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Fixed pause between rate-limited attempts, in seconds.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    /// HTTP request timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_generation_endpoint() -> String {
    "https://api.anthropic.com/v1/messages".into()
}

fn default_generation_model() -> String {
    "claude-sonnet-4-20250514".into()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_generation_key_env() -> String {
    "ANTHROPIC_API_KEY".into()
}

fn default_api_version() -> String {
    "2023-06-01".into()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    15
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_generation_endpoint(),
            model: default_generation_model(),
            max_tokens: default_max_tokens(),
            api_key_env: default_generation_key_env(),
            api_version: default_api_version(),
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Settings for the review CLI and its HTTP fallback.
///
/// # Examples
///
/// ```
/// use relay_core::ReviewConfig;
///
/// let config = ReviewConfig::default();
/// assert_eq!(config.args, vec!["exec".to_string()]);
/// assert_eq!(config.cli_timeout_secs, 120);
/// assert_eq!(config.api_key_env, "OPENAI_API_KEY");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Review CLI executable, looked up on `PATH`.
    #[serde(default = "default_program")]
    pub program: String,
    /// Arguments placed before the prompt.
    #[serde(default = "default_program_args")]
    pub args: Vec<String>,
    /// Wall-clock bound for the CLI, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub cli_timeout_secs: u64,
    /// Largest stdout the CLI may produce before the run is abandoned.
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
    /// Prompts above this size are staged in a temp file and piped to stdin.
    #[serde(default = "default_max_arg_bytes")]
    pub max_arg_bytes: usize,
    /// Chat completions endpoint used by the fallback.
    #[serde(default = "default_review_endpoint")]
    pub endpoint: String,
    /// Model used by the fallback.
    #[serde(default = "default_review_model")]
    pub model: String,
    /// Environment variable holding the fallback API key.
    #[serde(default = "default_review_key_env")]
    pub api_key_env: String,
    /// Attempts made while the fallback answers 429.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Fixed pause between rate-limited fallback attempts, in seconds.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    /// HTTP request timeout for the fallback, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_program() -> String {
    "codex".into()
}

fn default_program_args() -> Vec<String> {
    vec!["exec".into()]
}

fn default_max_output_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_max_arg_bytes() -> usize {
    100 * 1024
}

fn default_review_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".into()
}

fn default_review_model() -> String {
    "gpt-4o".into()
}

fn default_review_key_env() -> String {
    "OPENAI_API_KEY".into()
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_program_args(),
            cli_timeout_secs: default_timeout_secs(),
            max_output_bytes: default_max_output_bytes(),
            max_arg_bytes: default_max_arg_bytes(),
            endpoint: default_review_endpoint(),
            model: default_review_model(),
            api_key_env: default_review_key_env(),
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// An API key snapshotted from the environment at start-up.
///
/// The value is only demanded when a code path actually needs it, so a
/// missing key for an unused provider never fails a run.
///
/// # Examples
///
/// ```
/// use relay_core::Credential;
///
/// let present = Credential::new("TOKEN", Some("abc".into()));
/// assert_eq!(present.require().unwrap(), "abc");
///
/// let absent = Credential::new("TOKEN", None);
/// assert!(absent.require().is_err());
/// ```
#[derive(Debug, Clone)]
pub struct Credential {
    var: String,
    value: Option<String>,
}

impl Credential {
    /// Create a credential from an explicit value.
    pub fn new(var: impl Into<String>, value: Option<String>) -> Self {
        Self {
            var: var.into(),
            value,
        }
    }

    /// Read `var` from the process environment. Empty values count as unset.
    pub fn from_env(var: &str) -> Self {
        let value = std::env::var(var).ok().filter(|v| !v.trim().is_empty());
        Self::new(var, value)
    }

    /// Name of the backing environment variable.
    pub fn var(&self) -> &str {
        &self.var
    }

    /// Return the key, or [`RelayError::MissingCredential`] when unset.
    pub fn require(&self) -> Result<&str, RelayError> {
        self.value
            .as_deref()
            .ok_or_else(|| RelayError::MissingCredential {
                var: self.var.clone(),
            })
    }
}
