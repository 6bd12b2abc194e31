//! Fixed-delay retry on HTTP 429.
//!
//! Only rate limiting is retried. Every other status and every transport
//! failure is returned to the caller on the first occurrence.

use std::time::Duration;

use relay_core::RelayError;

use crate::llm::Transport;

/// How many times to try and how long to pause between rate-limited attempts.
///
/// # Examples
///
/// ```
/// use relay_invoke::retry::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.max_attempts, 3);
/// assert_eq!(policy.delay, Duration::from_secs(15));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Pause before each retry.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Policy with `max_attempts` tries spaced `delay` apart. At least one
    /// attempt is always made.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(3, Duration::from_secs(15))
    }
}

/// Attempt counter for a single call. Dropped once the call finishes.
#[derive(Debug)]
pub struct RetryState {
    attempt: u32,
    policy: RetryPolicy,
}

impl RetryState {
    /// Start at attempt 1.
    pub fn new(policy: RetryPolicy) -> Self {
        Self { attempt: 1, policy }
    }

    /// Current attempt number, starting at 1.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Move to the next attempt, returning the pause to take first, or
    /// `None` when the budget is spent.
    pub fn advance(&mut self) -> Option<Duration> {
        if self.attempt >= self.policy.max_attempts {
            return None;
        }
        self.attempt += 1;
        Some(self.policy.delay)
    }
}

/// POST `body` to `url`, retrying on 429, and return the body of the first
/// 200 response.
///
/// The request body is resent unchanged on every attempt.
///
/// # Errors
///
/// - [`RelayError::RetriesExhausted`] after `max_attempts` consecutive 429s
/// - [`RelayError::ApiError`] for any status other than 200 and 429
/// - [`RelayError::Transport`] for network-level failures
pub async fn post_with_retry(
    transport: &dyn Transport,
    url: &str,
    headers: &[(&str, &str)],
    body: &serde_json::Value,
    policy: RetryPolicy,
) -> Result<String, RelayError> {
    let mut state = RetryState::new(policy);
    loop {
        let response = transport.post_json(url, headers, body).await?;
        match response.status {
            200 => return Ok(response.body),
            429 => {
                let attempt = state.attempt();
                let Some(delay) = state.advance() else {
                    tracing::warn!(attempts = attempt, url, "rate limited, giving up");
                    return Err(RelayError::RetriesExhausted { attempts: attempt });
                };
                tracing::warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_secs = delay.as_secs(),
                    "rate limited, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            status => {
                return Err(RelayError::ApiError {
                    status,
                    body: response.body,
                })
            }
        }
    }
}
