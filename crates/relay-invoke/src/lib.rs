//! Resilient invocation of AI generation and code-review providers.
//!
//! Provides the invocation pipeline: artifact reading and prompt assembly,
//! the rate-limit aware HTTP client, the CLI-then-HTTP review runner,
//! lenient result normalization, and output routing.

pub mod cli;
pub mod context;
pub mod git;
pub mod llm;
pub mod normalize;
pub mod output;
pub mod prompt;
pub mod retry;
pub mod review;

#[cfg(test)]
mod fakes;
