//! # Statbot Error Types
//!
//! File: cli/src/core/error.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! This module defines the error types shared across Statbot. It follows the
//! same split used everywhere in the crate:
//! - `StatbotError`: a `thiserror` enum for the failures callers need to tell apart
//! - `Result<T>`: an alias for `anyhow::Result<T>` for plumbing that only needs context
//!
//! The error domains map onto the operational policy of the service:
//! - Configuration errors (including a missing API key) are fatal at startup
//! - Dataset errors are logged and degrade to no-reference-data mode
//! - An empty user message is a per-request client error
//!
//! Failures of the outbound generation call have their own closed enum,
//! `chat::generation::GenerationError`, because they never leave the chat core.
//!
//! ## Examples
//!
//! ```rust
//! // Missing credential at startup
//! let key = std::env::var(API_KEY_ENV)
//!     .map_err(|_| StatbotError::MissingCredential { var: API_KEY_ENV.into() })?;
//!
//! // Distinguish a validation error from everything else
//! match service.reply(&session_id, &message).await {
//!     Err(StatbotError::EmptyMessage) => { /* 400 */ }
//!     other => { /* ... */ }
//! }
//! ```
//!
use std::path::PathBuf;
use thiserror::Error;

/// Custom error type for the Statbot application.
#[derive(Error, Debug)]
pub enum StatbotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Required environment variable '{var}' is not set (add it to the environment or a .env file).")]
    MissingCredential { var: String },

    #[error("Reference data file not found: {}", path.display())]
    DatasetNotFound { path: PathBuf },

    #[error("Failed to read reference data from {}: {reason}", path.display())]
    DatasetParse { path: PathBuf, reason: String },

    #[error("Message is empty.")]
    EmptyMessage,
}

/// Type alias for Result using anyhow::Error for broad compatibility.
pub type Result<T> = anyhow::Result<T>;
