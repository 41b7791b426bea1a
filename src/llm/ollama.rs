use crate::llm::client::{ensure_success, http_client, ChatMessage, LLMClient, LLMResponse, MessageRole};
use crate::types::{AppError, Result, ToolCall, ToolDefinition};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

/// Ollama client speaking the native `/api/chat` protocol.
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: String, model: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        })
    }

    async fn chat(&self, body: Value) -> Result<LLMResponse> {
        let url = format!("{}/api/chat", self.base_url);
        let response = self.http.post(&url).json(&body).send().await?;
        let response = ensure_success("Ollama", response).await?;
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
                        "function": {
                            "name": tc.name,
                            "arguments": tc.arguments
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
    let message = json
        .get("message")
        .ok_or_else(|| AppError::LLM("No message in response".into()))?;

    let content = message
        .get("content")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    let mut tool_calls = Vec::new();
    let mut finish_reason = "stop".to_string();

    if let Some(tc_array) = message.get("tool_calls").and_then(|v| v.as_array()) {
        for tc in tc_array {
            if let Some(func) = tc.get("function") {
                let name = func
                    .get("name")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                let arguments = func.get("arguments").cloned().unwrap_or(json!({}));
                tool_calls.push(ToolCall::new(name, arguments));
            }
        }
        if !tool_calls.is_empty() {
            finish_reason = "tool_calls".to_string();
        }
    }

    if tool_calls.is_empty() {
        if let Some(reason) = json.get("done_reason").and_then(|v| v.as_str()) {
            finish_reason = reason.to_string();
        }
    }

    Ok(LLMResponse {
        content,
        tool_calls,
        finish_reason,
    })
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": prompt}
            ],
            "stream": false,
            "options": { "temperature": 0 }
        });
        Ok(self.chat(body).await?.content)
    }

    async fn generate_with_tools_and_history(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse> {
        let mut body = json!({
            "model": self.model,
            "messages": messages.iter().map(message_json).collect::<Vec<_>>(),
            "stream": false,
            "options": { "temperature": 0 }
        });
        if !tools.is_empty() {
            body["tools"] = Value::Array(tools.iter().map(tool_json).collect());
        }
        self.chat(body).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
