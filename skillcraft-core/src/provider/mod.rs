//! # LLM Provider Interface
//!
//! A trait-based abstraction for the completion backend used by semantic
//! functions and planners.
//!
//! ## Design
//! - `LlmProvider` trait defines the core interface (object safe, shared as
//!   `Arc<dyn LlmProvider>`)
//! - Implementations for OpenAI-compatible APIs (OpenAI, the local bridge,
//!   vLLM/Ollama) and Anthropic
//! - `complete_text` is the single-prompt entry point skills and planners use

pub mod anthropic;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAIProvider;

use crate::error::{Error, ErrorKind, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

// ============================================================================
// Core Types
// ============================================================================

/// A chat message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Some(content.into()),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(content.into()),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(content.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Request parameters for a completion
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
    pub stop: Option<Vec<String>>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn with_max_tokens(mut self, max: usize) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_stop(mut self, stop: Vec<String>) -> Self {
        self.stop = if stop.is_empty() { None } else { Some(stop) };
        self
    }
}

/// Knobs for a single-prompt completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionSettings {
    pub max_tokens: usize,
    pub temperature: f32,
    #[serde(default)]
    pub stop_sequences: Vec<String>,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            max_tokens: 256,
            temperature: 0.0,
            stop_sequences: Vec::new(),
        }
    }
}

impl CompletionSettings {
    pub fn with_max_tokens(mut self, max: usize) -> Self {
        self.max_tokens = max;
        self
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = temp;
        self
    }

    pub fn with_stop_sequence(mut self, stop: impl Into<String>) -> Self {
        self.stop_sequences.push(stop.into());
        self
    }

    /// Build a one-message request from these settings
    pub fn to_request(&self, prompt: &str) -> CompletionRequest {
        CompletionRequest::new(vec![ChatMessage::user(prompt)])
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
            .with_stop(self.stop_sequences.clone())
    }
}

/// Response from a completion request
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub id: String,
    pub model: String,
    pub content: Option<String>,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Unknown,
}

/// Token usage information
#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

// ============================================================================
// Provider Trait
// ============================================================================

/// Error type for provider operations
#[derive(Debug)]
pub enum ProviderError {
    /// Network/connection error
    Network(String),
    /// API returned an error
    Api { status: u16, message: String },
    /// Failed to parse response
    Parse(String),
    /// Rate limited
    RateLimited { retry_after: Option<u64> },
    /// Invalid request
    InvalidRequest(String),
    /// Authentication failed
    AuthenticationFailed,
    /// Other error
    Other(String),
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(e) => write!(f, "Network error: {}", e),
            Self::Api { status, message } => write!(f, "API error ({}): {}", status, message),
            Self::Parse(e) => write!(f, "Parse error: {}", e),
            Self::RateLimited { retry_after } => {
                write!(f, "Rate limited")?;
                if let Some(secs) = retry_after {
                    write!(f, " (retry after {}s)", secs)?;
                }
                Ok(())
            }
            Self::InvalidRequest(e) => write!(f, "Invalid request: {}", e),
            Self::AuthenticationFailed => write!(f, "Authentication failed"),
            Self::Other(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ProviderError {}

impl ProviderError {
    /// Convert into the crate error, keeping self as the source
    pub fn into_error(self) -> Error {
        let kind = match &self {
            Self::Network(_) => ErrorKind::NetworkFailed,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::AuthenticationFailed => ErrorKind::ConfigInvalid,
            Self::Api { status, .. } if *status >= 500 => ErrorKind::ProviderUnavailable,
            _ => ErrorKind::InferenceFailed,
        };
        let mut err = Error::new(kind, self.to_string()).with_operation("provider::complete");
        if let Self::RateLimited { retry_after: Some(secs) } = &self {
            err = err.with_context("retry_after", secs.to_string());
        }
        err.set_source(self)
    }

    /// Classify a non-success HTTP status
    pub(crate) fn from_status(status: u16, retry_after: Option<u64>, message: String) -> Self {
        match status {
            401 | 403 => Self::AuthenticationFailed,
            429 => Self::RateLimited { retry_after },
            400 | 404 | 422 => Self::InvalidRequest(message),
            _ => Self::Api { status, message },
        }
    }
}

/// Send `request` and decode a JSON body, classifying failures
pub(crate) async fn send_json<T: serde::de::DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> std::result::Result<T, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok());
        let message = response.text().await.unwrap_or_default();
        return Err(ProviderError::from_status(status.as_u16(), retry_after, message));
    }

    response
        .json()
        .await
        .map_err(|e| ProviderError::Parse(e.to_string()))
}

/// The main LLM provider trait
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name (e.g., "openai", "anthropic")
    fn name(&self) -> &str;

    /// Get the default model
    fn default_model(&self) -> &str;

    /// Send a completion request and get a full response
    async fn complete(&self, request: CompletionRequest) -> std::result::Result<CompletionResponse, ProviderError>;

    /// Single prompt -> text, with explicit settings
    async fn complete_text(
        &self,
        prompt: &str,
        settings: &CompletionSettings,
    ) -> std::result::Result<String, ProviderError> {
        let response = self.complete(settings.to_request(prompt)).await?;
        response.content.ok_or_else(|| ProviderError::Other("No content in response".into()))
    }
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// Configuration for creating providers
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub provider_type: ProviderType,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub default_model: Option<String>,
    pub headers: HashMap<String, String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    OpenAI,
    Anthropic,
    Bridge,
    Local,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::OpenAI => "openai",
            ProviderType::Anthropic => "anthropic",
            ProviderType::Bridge => "bridge",
            ProviderType::Local => "local",
        }
    }
}

impl std::str::FromStr for ProviderType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderType::OpenAI),
            "anthropic" => Ok(ProviderType::Anthropic),
            "bridge" => Ok(ProviderType::Bridge),
            "local" => Ok(ProviderType::Local),
            other => Err(Error::config_invalid(format!("unknown provider '{}'", other))
                .with_context("expected", "openai|anthropic|bridge|local")),
        }
    }
}

/// Environment variable selecting the provider type
pub const ENV_PROVIDER: &str = "SKILLCRAFT_PROVIDER";
/// Environment variable overriding the model
pub const ENV_MODEL: &str = "SKILLCRAFT_MODEL";
/// Environment variable overriding the base URL
pub const ENV_BASE_URL: &str = "SKILLCRAFT_BASE_URL";

impl ProviderConfig {
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            provider_type: ProviderType::OpenAI,
            api_key: Some(api_key.into()),
            base_url: Some("https://api.openai.com/v1".into()),
            default_model: Some("gpt-4o".into()),
            headers: HashMap::new(),
            timeout_secs: Some(120),
        }
    }

    pub fn anthropic(api_key: impl Into<String>) -> Self {
        let mut headers = HashMap::new();
        headers.insert("anthropic-version".into(), "2023-06-01".into());

        Self {
            provider_type: ProviderType::Anthropic,
            api_key: Some(api_key.into()),
            base_url: Some("https://api.anthropic.com/v1".into()),
            default_model: Some("claude-sonnet-4-20250514".into()),
            headers,
            timeout_secs: Some(120),
        }
    }

    /// Connect to a local OpenAI-compatible bridge
    /// Default port: 5168
    pub fn bridge() -> Self {
        Self {
            provider_type: ProviderType::Bridge,
            api_key: None,
            base_url: Some("http://localhost:5168/v1".into()),
            default_model: Some("claude-opus-4".into()),
            headers: HashMap::new(),
            timeout_secs: Some(300),
        }
    }

    pub fn local(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider_type: ProviderType::Local,
            api_key: None,
            base_url: Some(base_url.into()),
            default_model: Some(model.into()),
            headers: HashMap::new(),
            timeout_secs: Some(300),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Build a config from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup (the environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider_type = match get(ENV_PROVIDER) {
            Some(name) => name.parse::<ProviderType>()?,
            None if get("OPENAI_API_KEY").is_some() => ProviderType::OpenAI,
            None if get("ANTHROPIC_API_KEY").is_some() => ProviderType::Anthropic,
            None => ProviderType::Bridge,
        };

        let missing = |key: &'static str| {
            Error::config_invalid(format!(
                "provider '{}' requires {}",
                provider_type.as_str(),
                key
            ))
            .with_context("variable", key)
        };

        let mut config = match provider_type {
            ProviderType::OpenAI => {
                Self::openai(get("OPENAI_API_KEY").ok_or_else(|| missing("OPENAI_API_KEY"))?)
            }
            ProviderType::Anthropic => Self::anthropic(
                get("ANTHROPIC_API_KEY").ok_or_else(|| missing("ANTHROPIC_API_KEY"))?,
            ),
            ProviderType::Bridge => Self::bridge(),
            ProviderType::Local => {
                let base_url = get(ENV_BASE_URL).ok_or_else(|| missing(ENV_BASE_URL))?;
                let model = get(ENV_MODEL).ok_or_else(|| missing(ENV_MODEL))?;
                Self::local(base_url, model)
            }
        };

        if let Some(model) = get(ENV_MODEL) {
            config = config.with_model(model);
        }
        if let Some(base_url) = get(ENV_BASE_URL) {
            config = config.with_base_url(base_url);
        }
        Ok(config)
    }
}

/// Create a provider for the given configuration
pub fn create_provider(config: ProviderConfig) -> Result<Arc<dyn LlmProvider>> {
    match config.provider_type {
        ProviderType::Anthropic => Ok(Arc::new(AnthropicProvider::new(config)?)),
        ProviderType::OpenAI | ProviderType::Bridge | ProviderType::Local => {
            Ok(Arc::new(OpenAIProvider::new(config)?))
        }
    }
}

/// Build the shared HTTP client
fn http_client(config: &ProviderConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.timeout_secs.unwrap_or(120)))
        .build()
        .map_err(|e| {
            Error::new(ErrorKind::ProviderUnavailable, "failed to create HTTP client")
                .with_context("provider", config.provider_type.as_str())
                .set_source(e)
        })
}

// ============================================================================
// Tests
// ============================================================================
