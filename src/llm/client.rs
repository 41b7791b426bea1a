//! LLM Client abstractions and provider management
//!
//! The pipeline's collaborators talk to a model through [`LLMClient`]. Two
//! HTTP providers are supported:
//! - **Ollama**: local inference through the `/api/chat` endpoint
//! - **OpenAI**: any OpenAI-compatible `/chat/completions` endpoint

use crate::types::{AppError, Result, ToolCall, ToolDefinition};
use crate::utils::toml_config::ProviderConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Generic LLM client trait for provider abstraction
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate with system prompt
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Generate with a full message history and tool definitions
    async fn generate_with_tools_and_history(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Response from an LLM generation request
#[derive(Debug, Clone)]
pub struct LLMResponse {
    /// The text content of the response
    pub content: String,
    /// Any tool calls requested by the model
    pub tool_calls: Vec<ToolCall>,
    /// The reason generation stopped (e.g., "stop", "tool_calls", "length")
    pub finish_reason: String,
}

/// Role of a message sender in a chat exchange.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        }
    }
}

/// A message in a tool-calling conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    /// Tool calls requested by the assistant (only for Assistant role).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Id of the call this message answers (only for Tool role).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            tool_calls,
            tool_call_id: None,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// Provider enum for runtime selection
#[derive(Debug, Clone)]
pub enum Provider {
    /// OpenAI API provider (including compatible APIs)
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
        timeout: Duration,
    },

    /// Ollama local LLM provider
    Ollama {
        base_url: String,
        model: String,
        timeout: Duration,
    },
}

impl Provider {
    /// Resolve a provider for `model` from the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the OpenAI API key environment variable is unset.
    pub fn from_config(config: &ProviderConfig, model: &str) -> Result<Self> {
        match config {
            ProviderConfig::Ollama { base_url, .. } => Ok(Provider::Ollama {
                base_url: base_url.clone(),
                model: model.to_string(),
                timeout: config.request_timeout(),
            }),
            ProviderConfig::OpenAI {
                api_key_env,
                api_base,
                ..
            } => {
                let api_key = std::env::var(api_key_env).map_err(|_| {
                    AppError::Configuration(format!(
                        "Environment variable '{}' is not set",
                        api_key_env
                    ))
                })?;
                Ok(Provider::OpenAI {
                    api_key,
                    api_base: api_base.clone(),
                    model: model.to_string(),
                    timeout: config.request_timeout(),
                })
            }
        }
    }

    /// Create a client instance for this provider
    pub fn create_client(&self) -> Result<Arc<dyn LLMClient>> {
        match self {
            Provider::OpenAI {
                api_key,
                api_base,
                model,
                timeout,
            } => Ok(Arc::new(super::openai::OpenAIClient::new(
                api_key.clone(),
                api_base.clone(),
                model.clone(),
                *timeout,
            )?)),
            Provider::Ollama {
                base_url,
                model,
                timeout,
            } => Ok(Arc::new(super::ollama::OllamaClient::new(
                base_url.clone(),
                model.clone(),
                *timeout,
            )?)),
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAI { .. } => "OpenAI",
            Provider::Ollama { .. } => "Ollama",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Provider::OpenAI { model, .. } | Provider::Ollama { model, .. } => model,
        }
    }
}

/// Builds the shared HTTP client used by both providers.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::LLM(format!("Failed to build HTTP client: {}", e)))
}

/// Turns a non-success HTTP response into an `AppError::LLM`.
pub(crate) async fn ensure_success(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    Err(AppError::LLM(format!(
        "{} request failed ({}): {}",
        provider, status, text
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_from_ollama_config() {
        let config = ProviderConfig::Ollama {
            base_url: "http://localhost:11434".to_string(),
            timeout_secs: 10,
        };
        let provider = Provider::from_config(&config, "llama3.2").unwrap();
        assert_eq!(provider.name(), "Ollama");
        assert_eq!(provider.model(), "llama3.2");
        assert!(provider.create_client().is_ok());
    }

    #[test]
    fn test_openai_requires_key_env() {
        let config = ProviderConfig::OpenAI {
            api_key_env: "THINKLE_TEST_KEY_THAT_IS_NOT_SET".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            timeout_secs: 10,
        };
        let err = Provider::from_config(&config, "gpt-4o-mini").unwrap_err();
        assert!(err.to_string().contains("THINKLE_TEST_KEY_THAT_IS_NOT_SET"));
    }

    #[test]
    fn test_chat_message_constructors() {
        let msg = ChatMessage::tool_result("call_1", "42");
        assert_eq!(msg.role, MessageRole::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));

        let msg = ChatMessage::assistant("", vec![ToolCall::new("web_search", serde_json::json!({}))]);
        assert_eq!(msg.role.as_str(), "assistant");
        assert_eq!(msg.tool_calls.len(), 1);
    }
}
