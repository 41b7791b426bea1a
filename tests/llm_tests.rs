//! LLM client tests against mocked provider endpoints
//!
//! These tests use wiremock to stand in for the Ollama and OpenAI-compatible
//! APIs and validate request shape, response parsing and error handling.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thinkle::agents::{DecisionMaker, LlmDecisionMaker, LlmPlanner, Planner};
use thinkle::llm::{ChatMessage, LLMClient, Provider};
use thinkle::types::{TaskUnit, ToolDefinition};
use thinkle::ThinkleConfig;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============= Helper Functions =============

fn ollama_client(server: &MockServer) -> Arc<dyn LLMClient> {
    Provider::Ollama {
        base_url: server.uri(),
        model: "llama3.2".to_string(),
        timeout: Duration::from_secs(5),
    }
    .create_client()
    .unwrap()
}

fn openai_client(server: &MockServer) -> Arc<dyn LLMClient> {
    Provider::OpenAI {
        api_key: "test-key".to_string(),
        api_base: format!("{}/v1", server.uri()),
        model: "gpt-4o-mini".to_string(),
        timeout: Duration::from_secs(5),
    }
    .create_client()
    .unwrap()
}

fn ollama_reply(content: &str) -> serde_json::Value {
    json!({
        "model": "llama3.2",
        "created_at": "2026-01-01T00:00:00Z",
        "message": { "role": "assistant", "content": content },
        "done": true,
        "done_reason": "stop"
    })
}

fn search_tool() -> ToolDefinition {
    ToolDefinition {
        name: "web_search".to_string(),
        description: "Search the web".to_string(),
        parameters: json!({
            "type": "object",
            "properties": { "query": { "type": "string" } },
            "required": ["query"]
        }),
    }
}

// ============= Ollama =============

#[tokio::test]
async fn test_ollama_generate_with_system() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({ "model": "llama3.2", "stream": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(ollama_reply("Hello there")))
        .expect(1)
        .mount(&server)
        .await;

    let reply = ollama_client(&server)
        .generate_with_system("You are terse.", "Say hello")
        .await
        .unwrap();
    assert_eq!(reply, "Hello there");
}

#[tokio::test]
async fn test_ollama_tool_calls_are_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [
                    { "function": { "name": "web_search", "arguments": { "query": "rust 2026" } } }
                ]
            },
            "done": true
        })))
        .mount(&server)
        .await;

    let response = ollama_client(&server)
        .generate_with_tools_and_history(&[ChatMessage::user("find news")], &[search_tool()])
        .await
        .unwrap();

    assert_eq!(response.tool_calls.len(), 1);
    assert_eq!(response.tool_calls[0].name, "web_search");
    assert_eq!(response.tool_calls[0].arguments["query"], "rust 2026");
    assert_eq!(response.finish_reason, "tool_calls");
}

#[tokio::test]
async fn test_ollama_server_error_surfaces_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .mount(&server)
        .await;

    let err = ollama_client(&server)
        .generate_with_system("system", "prompt")
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("500"), "{message}");
    assert!(message.contains("model not loaded"), "{message}");
}

// ============= OpenAI =============

#[tokio::test]
async fn test_openai_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": { "role": "assistant", "content": "Hi" },
                "finish_reason": "stop"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = openai_client(&server)
        .generate_with_system("system", "prompt")
        .await
        .unwrap();
    assert_eq!(reply, "Hi");
}

#[tokio::test]
async fn test_openai_tool_request_disables_parallel_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({ "parallel_tool_calls": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": { "name": "web_search", "arguments": "{\"query\":\"ai\"}" }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = openai_client(&server)
        .generate_with_tools_and_history(&[ChatMessage::user("news")], &[search_tool()])
        .await
        .unwrap();

    assert_eq!(response.tool_calls[0].id, "call_1");
    assert_eq!(response.tool_calls[0].arguments, json!({ "query": "ai" }));
}

#[tokio::test]
async fn test_openai_missing_api_key_is_a_configuration_error() {
    let config: ThinkleConfig = ThinkleConfig::from_toml_str(
        r#"
interests = ["ai"]

[provider]
type = "openai"
api_key_env = "THINKLE_TEST_KEY_THAT_IS_NEVER_SET"
"#,
    )
    .unwrap();

    let err = Provider::from_config(&config.provider, "gpt-4o-mini").unwrap_err();
    assert!(err.to_string().contains("THINKLE_TEST_KEY_THAT_IS_NEVER_SET"));
}

// ============= Agents over HTTP =============

#[tokio::test]
async fn test_planner_reads_tasks_from_fenced_reply() {
    let server = MockServer::start().await;
    let reply = "Here is the plan:\n```json\n{\"tasks\": [\
        {\"topic\": \"rust async\", \"context\": \"runtime news\"},\
        {\"topic\": \"llm agents\"}]}\n```";
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ollama_reply(reply)))
        .mount(&server)
        .await;

    let brief = thinkle::agents::Brief::from_config(&ThinkleConfig::example());
    let plan = LlmPlanner::new(ollama_client(&server)).plan(&brief).await.unwrap();

    let topics: Vec<&str> = plan.tasks.iter().map(|t| t.topic.as_str()).collect();
    assert_eq!(topics, vec!["rust async", "llm agents"]);
    assert_eq!(plan.tasks[0].context, "runtime news");
    assert_eq!(plan.max_task_count, brief.max_tasks);
}

#[tokio::test]
async fn test_decision_maker_text_reply_stops() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ollama_reply("I have enough.")))
        .mount(&server)
        .await;

    let decision = LlmDecisionMaker::new(ollama_client(&server), 3)
        .decide(&TaskUnit::new("ai", ""), &[], &[search_tool()])
        .await
        .unwrap();

    assert_eq!(decision, thinkle::agents::Decision::Stop { output: None });
}
