use crate::llm::client::{ensure_success, http_client, ChatMessage, LLMClient, LLMResponse, MessageRole};
use crate::types::{AppError, Result, ToolCall, ToolDefinition};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

/// Client for OpenAI and OpenAI-compatible `/chat/completions` endpoints.
pub struct OpenAIClient {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
}

impl OpenAIClient {
    pub fn new(api_key: String, api_base: String, model: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            model,
        })
    }

    async fn complete(&self, body: Value) -> Result<LLMResponse> {
        let url = format!("{}/chat/completions", self.api_base);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let response = ensure_success("OpenAI", response).await?;
        let json: Value = response
            .json()
            .await
            .map_err(|e| AppError::LLM(format!("Failed to parse response: {}", e)))?;
        parse_response(&json)
    }
}

fn message_json(message: &ChatMessage) -> Value {
    match message.role {
        MessageRole::Assistant if !message.tool_calls.is_empty() => {
            let tool_calls: Vec<Value> = message
                .tool_calls
                .iter()
                .map(|tc| {
                    json!({
                        "id": tc.id,
                        "type": "function",
                        "function": {
                            "name": tc.name,
                            "arguments": tc.arguments.to_string()
                        }
                    })
                })
                .collect();
            json!({
                "role": "assistant",
                "content": message.content,
                "tool_calls": tool_calls
            })
        }
        MessageRole::Tool => json!({
            "role": "tool",
            "content": message.content,
            "tool_call_id": message.tool_call_id.clone().unwrap_or_default()
        }),
        role => json!({
            "role": role.as_str(),
            "content": message.content
        }),
    }
}

fn tool_json(tool: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters
        }
    })
}

fn parse_response(json: &Value) -> Result<LLMResponse> {
    let choice = json
        .get("choices")
        .and_then(|c| c.get(0))
        .ok_or_else(|| AppError::LLM("No response from OpenAI".to_string()))?;
    let message = choice
        .get("message")
        .ok_or_else(|| AppError::LLM("No message in response".to_string()))?;

    let content = message
        .get("content")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    let mut tool_calls = Vec::new();
    if let Some(calls) = message.get("tool_calls").and_then(|v| v.as_array()) {
        for call in calls {
            let Some(func) = call.get("function") else {
                continue;
            };
            let name = func
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            // Arguments arrive as a JSON-encoded string
            let arguments = match func.get("arguments") {
                Some(Value::String(raw)) => serde_json::from_str(raw).map_err(|e| {
                    AppError::LLM(format!("Invalid tool arguments for '{}': {}", name, e))
                })?,
                Some(other) => other.clone(),
                None => json!({}),
            };
            let id = call
                .get("id")
                .and_then(|v| v.as_str())
                .map(String::from)
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            tool_calls.push(ToolCall {
                id,
                name,
                arguments,
            });
        }
    }

    let finish_reason = choice
        .get("finish_reason")
        .and_then(|v| v.as_str())
        .unwrap_or("stop")
        .to_string();

    Ok(LLMResponse {
        content,
        tool_calls,
        finish_reason,
    })
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": prompt}
            ],
            "temperature": 0
        });
        Ok(self.complete(body).await?.content)
    }

    async fn generate_with_tools_and_history(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse> {
        let mut body = json!({
            "model": self.model,
            "messages": messages.iter().map(message_json).collect::<Vec<_>>(),
            "temperature": 0
        });
        if !tools.is_empty() {
            body["tools"] = Value::Array(tools.iter().map(tool_json).collect());
            body["parallel_tool_calls"] = Value::Bool(false);
        }
        self.complete(body).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
