//! Core types, configuration, and error handling for relay.
//!
//! This crate provides the shared foundation used by the invocation crate and
//! the CLI:
//! - [`RelayError`] — unified error type using `thiserror` and `miette`
//! - [`RelayConfig`] — configuration loaded from `.relay.toml`
//! - [`Credential`] — lazily demanded API keys
//! - Shared types: [`Artifact`], [`InvocationRequest`], [`ReviewResult`],
//!   [`Issue`], [`Severity`]

mod config;
mod error;
mod types;

pub use config::{Credential, GenerationConfig, RelayConfig, ReviewConfig};
pub use error::RelayError;
pub use types::{Artifact, InvocationRequest, Issue, ReviewResult, Severity};

/// A convenience `Result` type for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;
