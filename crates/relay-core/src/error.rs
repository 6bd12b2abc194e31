use std::path::PathBuf;

/// Errors that can occur while invoking a generation or review provider.
///
/// Library crates return this type directly; the binary renders it through
/// `miette` at the boundary, so every variant carries a diagnostic code.
///
/// # Examples
///
/// ```
/// use relay_core::RelayError;
///
/// let err = RelayError::MissingCredential { var: "ANTHROPIC_API_KEY".into() };
/// assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum RelayError {
    /// Filesystem I/O failure outside of input artifacts.
    #[error("IO error: {0}")]
    #[diagnostic(code(relay::io))]
    Io(#[from] std::io::Error),

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    #[diagnostic(code(relay::config))]
    Config(String),

    /// A required credential is not present in the environment.
    #[error("missing credential: {var} is not set")]
    #[diagnostic(
        code(relay::missing_credential),
        help("export the variable before running, or set api_key_env in .relay.toml")
    )]
    MissingCredential {
        /// Name of the environment variable that was consulted.
        var: String,
    },

    /// An input artifact could not be read.
    #[error("cannot read {}", .path.display())]
    #[diagnostic(code(relay::file_unreadable))]
    FileUnreadable {
        /// Path that was requested.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Network-level failure: connection refused, timeout, TLS.
    #[error("transport error: {0}")]
    #[diagnostic(code(relay::transport))]
    Transport(String),

    /// Every attempt was answered with HTTP 429.
    #[error("rate limited: retries exhausted after {attempts} attempts")]
    #[diagnostic(
        code(relay::retries_exhausted),
        help("the provider kept throttling requests; wait a while and run again")
    )]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
    },

    /// The provider answered with a non-success, non-429 status.
    #[error("API error {status}: {body}")]
    #[diagnostic(code(relay::api))]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The response envelope had no usable text.
    #[error("empty response: {0}")]
    #[diagnostic(code(relay::empty_response))]
    EmptyResponse(String),

    /// Review output did not contain a parsable result object.
    #[error("unparsable review result: {0}")]
    #[diagnostic(code(relay::unparsable_result))]
    UnparsableResult(String),

    /// The review CLI is not installed.
    #[error("review tool `{program}` is not available")]
    #[diagnostic(code(relay::subprocess_unavailable))]
    SubprocessUnavailable {
        /// Program that was looked up.
        program: String,
    },

    /// The review CLI ran but did not produce usable output.
    #[error("review tool failed: {0}")]
    #[diagnostic(code(relay::subprocess))]
    Subprocess(String),

    /// There was nothing to send to the provider.
    #[error("nothing to send: {0}")]
    #[diagnostic(code(relay::empty_input))]
    EmptyInput(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    #[diagnostic(code(relay::serialization))]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    #[diagnostic(code(relay::toml))]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: RelayError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn file_unreadable_shows_path() {
        let err = RelayError::FileUnreadable {
            path: PathBuf::from("/tmp/missing.md"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.to_string().contains("/tmp/missing.md"));
    }

    #[test]
    fn retries_exhausted_mentions_retries() {
        let err = RelayError::RetriesExhausted { attempts: 3 };
        assert_eq!(
            err.to_string(),
            "rate limited: retries exhausted after 3 attempts"
        );
    }

    #[test]
    fn api_error_carries_status_and_body() {
        let err = RelayError::ApiError {
            status: 500,
            body: "boom".into(),
        };
        assert_eq!(err.to_string(), "API error 500: boom");
    }
}
