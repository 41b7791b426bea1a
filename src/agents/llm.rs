use crate::agents::prompts;
use crate::agents::{Brief, Composer, Decision, DecisionMaker, Plan, Planner, Scorecard, Scorer, StyleConfig};
use crate::llm::{ChatMessage, LLMClient};
use crate::research::parse::{findings_schema, parse_json};
use crate::types::{AppError, Exchange, Finding, InformationGap, Result, TaskUnit, ToolDefinition};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;

/// Rebuilds the chat transcript of one worker from its history.
fn transcript(system: String, task: &TaskUnit, history: &[Exchange]) -> Vec<ChatMessage> {
    let mut messages = vec![
        ChatMessage::system(system),
        ChatMessage::user(format!("Investigate: {}", task.topic)),
    ];

    for round in history.chunk_by(|a, b| a.round == b.round) {
        let calls = round.iter().map(|e| e.call.clone()).collect();
        messages.push(ChatMessage::assistant("", calls));
        for exchange in round {
            messages.push(ChatMessage::tool_result(
                exchange.call.id.clone(),
                exchange.output.clone(),
            ));
        }
    }
    messages
}

/// Scout driven by a tool-calling model.
///
/// A text reply ends the capability rounds; the structured findings always
/// come from [`DecisionMaker::conclude`], which asks for the findings schema.
pub struct LlmDecisionMaker {
    client: Arc<dyn LLMClient>,
    max_rounds: usize,
}

impl LlmDecisionMaker {
    pub fn new(client: Arc<dyn LLMClient>, max_rounds: usize) -> Self {
        Self { client, max_rounds }
    }
}

#[async_trait]
impl DecisionMaker for LlmDecisionMaker {
    async fn decide(
        &self,
        task: &TaskUnit,
        history: &[Exchange],
        capabilities: &[ToolDefinition],
    ) -> Result<Decision> {
        let messages = transcript(prompts::scout_system(task, self.max_rounds), task, history);
        let response = self
            .client
            .generate_with_tools_and_history(&messages, capabilities)
            .await?;

        if response.tool_calls.is_empty() {
            tracing::debug!(finish = %response.finish_reason, "scout finished tool use");
            Ok(Decision::Stop { output: None })
        } else {
            Ok(Decision::Invoke(response.tool_calls))
        }
    }

    async fn conclude(&self, task: &TaskUnit, history: &[Exchange]) -> Result<Decision> {
        let schema = serde_json::to_string_pretty(&findings_schema())
            .map_err(|e| AppError::Internal(e.to_string()))?;
        let mut messages = transcript(prompts::scout_system(task, self.max_rounds), task, history);
        messages.push(ChatMessage::user(prompts::scout_conclude(task, &schema)));

        let response = self
            .client
            .generate_with_tools_and_history(&messages, &[])
            .await?;

        if response.tool_calls.is_empty() {
            Ok(Decision::stop_with(response.content))
        } else {
            Ok(Decision::Invoke(response.tool_calls))
        }
    }
}

#[derive(Debug, Deserialize)]
struct PlannerReply {
    #[serde(alias = "ScoutTasks")]
    tasks: Vec<TaskUnit>,
}

pub struct LlmPlanner {
    client: Arc<dyn LLMClient>,
}

impl LlmPlanner {
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Planner for LlmPlanner {
    async fn plan(&self, brief: &Brief) -> Result<Plan> {
        let reply = self
            .client
            .generate_with_system(&prompts::planner_system(brief), "Plan the research tasks.")
            .await?;
        let (parsed, confidence) = parse_json::<PlannerReply>(&reply)
            .map_err(|e| AppError::InvalidResponse(format!("planner reply: {}", e)))?;
        tracing::debug!(tasks = parsed.tasks.len(), ?confidence, "planner replied");

        Ok(Plan {
            tasks: parsed.tasks,
            max_task_count: brief.max_tasks,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ScorerReply {
    ranked: Vec<usize>,
    #[serde(default, alias = "InvestigatorTasks")]
    gaps: Vec<InformationGap>,
    #[serde(default, alias = "Explanation")]
    explanation: Option<String>,
}

/// Editor that ranks findings by index and names follow-up gaps.
pub struct LlmScorer {
    client: Arc<dyn LLMClient>,
}

impl LlmScorer {
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Scorer for LlmScorer {
    async fn score(&self, findings: &[Finding], profile: &str) -> Result<Scorecard> {
        if findings.is_empty() {
            return Ok(Scorecard::default());
        }

        let reply = self
            .client
            .generate_with_system(
                &prompts::scorer_system(profile),
                &prompts::findings_listing(findings),
            )
            .await?;
        let (parsed, _) = parse_json::<ScorerReply>(&reply)
            .map_err(|e| AppError::InvalidResponse(format!("scorer reply: {}", e)))?;

        if let Some(explanation) = &parsed.explanation {
            tracing::debug!(%explanation, "scorer explanation");
        }

        let mut seen = HashSet::new();
        let ranked = parsed
            .ranked
            .into_iter()
            .filter(|&i| i < findings.len() && seen.insert(i))
            .map(|i| findings[i].clone())
            .collect();

        Ok(Scorecard {
            ranked,
            gaps: parsed.gaps,
        })
    }
}

pub struct LlmComposer {
    client: Arc<dyn LLMClient>,
    profile: String,
}

impl LlmComposer {
    pub fn new(client: Arc<dyn LLMClient>, profile: impl Into<String>) -> Self {
        Self {
            client,
            profile: profile.into(),
        }
    }
}

#[async_trait]
impl Composer for LlmComposer {
    async fn compose(&self, findings: &[Finding], style: &StyleConfig) -> Result<String> {
        let document = self
            .client
            .generate_with_system(
                &prompts::composer_system(style, &self.profile),
                &prompts::findings_listing(findings),
            )
            .await?;

        let document = document.trim();
        if document.is_empty() {
            return Err(AppError::InvalidResponse("composer returned an empty document".into()));
        }
        Ok(document.to_string())
    }
}
