//! LLM integration for the AI-assisted classifier.
//!
//! The classifier talks to Anthropic or OpenAI through rig-core; `RigAdapter`
//! narrows rig's `CompletionModel` to the `LlmProvider` trait the classifier
//! and its test doubles share.

pub mod provider;
mod rig_adapter;

pub use provider::*;
pub use rig_adapter::RigAdapter;

use std::sync::Arc;

use rig::client::CompletionClient;
use secrecy::ExposeSecret;

use crate::error::{ConfigError, LlmError};

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Anthropic,
    OpenAi,
}

impl LlmBackend {
    /// Parse a `CRISIS_LLM_BACKEND` value.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "anthropic" => Some(Self::Anthropic),
            "openai" => Some(Self::OpenAi),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
        }
    }

    /// Environment variable holding this backend's API key.
    pub fn key_var(self) -> &'static str {
        match self {
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }

    /// A model that answers the short JSON verdicts the classifier asks for.
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Anthropic => "claude-sonnet-4-20250514",
            Self::OpenAi => "gpt-4o",
        }
    }
}

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: secrecy::SecretString,
    pub model: String,
}

impl LlmConfig {
    /// Build from environment. Returns `Ok(None)` when no API key is set,
    /// which leaves the pipeline on rule-based classification only.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Self>, ConfigError> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let backend = match var("CRISIS_LLM_BACKEND") {
            None => LlmBackend::Anthropic,
            Some(raw) => LlmBackend::parse(&raw).ok_or_else(|| ConfigError::InvalidValue {
                key: "CRISIS_LLM_BACKEND".to_string(),
                message: format!("unsupported backend '{raw}'"),
            })?,
        };

        let Some(api_key) = var(backend.key_var()) else {
            return Ok(None);
        };

        Ok(Some(Self {
            backend,
            api_key: secrecy::SecretString::from(api_key),
            model: var("CRISIS_LLM_MODEL").unwrap_or_else(|| backend.default_model().to_string()),
        }))
    }
}

/// Build the classifier's LLM for `config`.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    use rig::providers::{anthropic, openai};

    let key = config.api_key.expose_secret();
    let client_error = |e: &dyn std::fmt::Display| LlmError::RequestFailed {
        provider: config.backend.label().to_string(),
        reason: format!("client construction failed: {e}"),
    };

    let provider: Arc<dyn LlmProvider> = match config.backend {
        LlmBackend::Anthropic => {
            let client: rig::client::Client<anthropic::client::AnthropicExt> =
                anthropic::Client::new(key).map_err(|e| client_error(&e))?;
            Arc::new(RigAdapter::new(client.completion_model(&config.model), &config.model))
        }
        LlmBackend::OpenAi => {
            let client: rig::client::Client<openai::client::OpenAIResponsesExt> =
                openai::Client::new(key).map_err(|e| client_error(&e))?;
            Arc::new(RigAdapter::new(client.completion_model(&config.model), &config.model))
        }
    };

    tracing::info!(
        backend = config.backend.label(),
        model = %config.model,
        "Classifier LLM configured"
    );
    Ok(provider)
}
