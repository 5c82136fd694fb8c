//! Anthropic Claude provider implementation

use super::*;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Anthropic Claude provider
pub struct AnthropicProvider {
    client: Client,
    config: ProviderConfig,
}

impl AnthropicProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = http_client(&config)?;
        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or("https://api.anthropic.com/v1")
            .trim_end_matches('/')
    }
}

/// Split out the system prompt; Anthropic takes it as a top-level field
fn split_system(messages: &[ChatMessage]) -> (Option<String>, Vec<AnthropicMessage>) {
    let mut system = None;
    let mut rest = Vec::new();
    for msg in messages {
        if msg.role == Role::System {
            system = msg.content.clone();
        } else {
            rest.push(AnthropicMessage::from(msg));
        }
    }
    (system, rest)
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn default_model(&self) -> &str {
        self.config
            .default_model
            .as_deref()
            .unwrap_or("claude-sonnet-4-20250514")
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, ProviderError> {
        let model = request.model.as_deref().unwrap_or(self.default_model());
        let (system, messages) = split_system(&request.messages);

        let api_request = AnthropicRequest {
            model: model.to_string(),
            messages,
            system,
            max_tokens: request.max_tokens.unwrap_or(4096),
            temperature: request.temperature,
            stop_sequences: request.stop.clone(),
        };

        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or(ProviderError::AuthenticationFailed)?;

        let mut req = self
            .client
            .post(format!("{}/messages", self.base_url()))
            .header("x-api-key", api_key)
            .header("content-type", "application/json")
            .json(&api_request);

        for (key, value) in &self.config.headers {
            req = req.header(key, value);
        }

        let api_response: AnthropicResponse = send_json(req).await?;
        Ok(api_response.into())
    }
}

// ============================================================================
// Anthropic API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

impl From<&ChatMessage> for AnthropicMessage {
    fn from(msg: &ChatMessage) -> Self {
        let role = match msg.role {
            Role::User | Role::System => "user",
            Role::Assistant => "assistant",
        };

        Self {
            role: role.into(),
            content: msg.content.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    id: String,
    model: String,
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: usize,
    output_tokens: usize,
}

impl From<AnthropicResponse> for CompletionResponse {
    fn from(api_response: AnthropicResponse) -> Self {
        let mut content = String::new();
        for block in &api_response.content {
            if let ContentBlock::Text { text } = block {
                content.push_str(text);
            }
        }

        let finish_reason = match api_response.stop_reason.as_deref() {
            Some("end_turn") | Some("stop_sequence") => FinishReason::Stop,
            Some("max_tokens") => FinishReason::Length,
            _ => FinishReason::Unknown,
        };

        let usage = Usage {
            prompt_tokens: api_response.usage.input_tokens,
            completion_tokens: api_response.usage.output_tokens,
            total_tokens: api_response.usage.input_tokens + api_response.usage.output_tokens,
        };

        CompletionResponse {
            id: api_response.id,
            model: api_response.model,
            content: if content.is_empty() { None } else { Some(content) },
            finish_reason,
            usage,
        }
    }
}
