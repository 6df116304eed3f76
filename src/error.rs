//! Error types for the crisis desk.

use std::time::Duration;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors from the inbound message source and the outbound notification channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to send on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Failed to fetch from channel {name}: {reason}")]
    FetchFailed { name: String, reason: String },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Provider {provider} timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },
}

/// Errors raised by a single automation handler or store action.
///
/// These never escape the executor; they are folded into a `FAILED` record.
#[derive(Debug, thiserror::Error)]
pub enum AutomationError {
    #[error("Automation {name} failed: {reason}")]
    Failed { name: String, reason: String },

    #[error("Automation {name} panicked")]
    Panicked { name: String },

    #[error("Store action {action} failed: {reason}")]
    StoreAction { action: String, reason: String },
}

/// Pipeline-related errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Classification failed: {0}")]
    Classification(String),

    #[error("Unknown crisis type: {0}")]
    InvalidCrisisType(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}
