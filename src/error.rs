//! Error types for Inbox Assist.
//!
//! Component failures that the pipeline absorbs (fetch failures, handler
//! failures) never surface through these types — they land in the run's
//! error list or in per-action statuses. These enums cover the places
//! where a caller holds a real `Result`: configuration, the LLM provider,
//! the label sink, and daily-summary context sources.

/// Top-level error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Label sink error: {0}")]
    LabelSink(#[from] LabelSinkError),

    #[error("Context error: {0}")]
    Context(#[from] ContextError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Sender-label sink errors.
#[derive(Debug, thiserror::Error)]
pub enum LabelSinkError {
    #[error("Failed to encode label events: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to write label object {path}: {reason}")]
    Store { path: String, reason: String },
}

/// Daily-summary context source errors.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("Context source {name} failed: {reason}")]
    FetchFailed { name: String, reason: String },
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
