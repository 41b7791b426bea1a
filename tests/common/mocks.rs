//! Scripted collaborators and capabilities.
//!
//! Behaviour is keyed off task topics so a single plan can mix healthy,
//! failing and slow workers:
//!
//! - `fail...` - the decision-maker errors on its first call
//! - `hang...` - the decision-maker never answers
//! - `sleep:N ...` - the decision-maker waits N milliseconds before each answer
//! - `garbled...` - the worker concludes with text that is not JSON

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thinkle::agents::{
    Brief, Composer, Decision, DecisionMaker, Plan, Planner, Scorecard, Scorer, StyleConfig,
};
use thinkle::tools::Capability;
use thinkle::types::{
    AppError, Exchange, Finding, InformationGap, Result, TaskUnit, ToolCall, ToolDefinition,
};

/// Headline a scripted worker reports for `topic`.
pub fn headline_for(topic: &str) -> String {
    format!("{} roundup", topic)
}

fn findings_json(task: &TaskUnit) -> String {
    json!({
        "findings": [{
            "headline": headline_for(&task.topic),
            "summary": format!("What happened with {}", task.topic),
            "sources": [format!("https://example.com/{}", task.topic.replace(' ', "-"))],
            "tags": [task.topic.clone()]
        }],
        "explanation": "scripted"
    })
    .to_string()
}

fn sleep_millis(topic: &str) -> Option<u64> {
    topic
        .strip_prefix("sleep:")
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|n| n.parse().ok())
}

// ============= Decision-maker =============

/// Invokes `echo` each round until `rounds` rounds are done, then stops
/// with one finding per task.
pub struct ScriptedDecisionMaker {
    rounds: usize,
    calls_per_round: usize,
    decide_calls: AtomicUsize,
    max_round_seen: AtomicUsize,
}

impl ScriptedDecisionMaker {
    pub fn new(rounds: usize) -> Self {
        Self {
            rounds,
            calls_per_round: 1,
            decide_calls: AtomicUsize::new(0),
            max_round_seen: AtomicUsize::new(0),
        }
    }

    /// Never stops on its own; only the iteration cap ends the loop.
    pub fn relentless() -> Self {
        Self::new(usize::MAX)
    }

    /// Request `n` echo calls in every round instead of one.
    pub fn with_calls_per_round(mut self, n: usize) -> Self {
        self.calls_per_round = n;
        self
    }

    pub fn decide_calls(&self) -> usize {
        self.decide_calls.load(Ordering::SeqCst)
    }

    /// Highest round number present in any history it was shown.
    pub fn max_round_seen(&self) -> usize {
        self.max_round_seen.load(Ordering::SeqCst)
    }

    async fn pace(&self, task: &TaskUnit) -> Result<()> {
        if task.topic.starts_with("fail") {
            return Err(AppError::LLM(format!("scripted failure for {}", task.topic)));
        }
        if task.topic.starts_with("hang") {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if let Some(ms) = sleep_millis(&task.topic) {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        Ok(())
    }

    fn conclusion(task: &TaskUnit) -> Decision {
        if task.topic.starts_with("garbled") {
            Decision::stop_with("I could not find anything worth reporting.")
        } else {
            Decision::stop_with(findings_json(task))
        }
    }
}

#[async_trait]
impl DecisionMaker for ScriptedDecisionMaker {
    async fn decide(
        &self,
        task: &TaskUnit,
        history: &[Exchange],
        _capabilities: &[ToolDefinition],
    ) -> Result<Decision> {
        self.decide_calls.fetch_add(1, Ordering::SeqCst);
        let completed = history.last().map(|e| e.round).unwrap_or(0);
        self.max_round_seen.fetch_max(completed, Ordering::SeqCst);
        self.pace(task).await?;

        if completed < self.rounds {
            Ok(Decision::Invoke(
                (0..self.calls_per_round)
                    .map(|i| ToolCall::new("echo", json!({ "query": task.topic, "call": i })))
                    .collect(),
            ))
        } else {
            Ok(Self::conclusion(task))
        }
    }

    async fn conclude(&self, task: &TaskUnit, _history: &[Exchange]) -> Result<Decision> {
        Ok(Self::conclusion(task))
    }
}

// ============= Capabilities =============

/// Returns its arguments as text.
pub struct EchoCapability;

#[async_trait]
impl Capability for EchoCapability {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo the arguments back"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "query": { "type": "string" } },
            "required": ["query"]
        })
    }

    async fn invoke(&self, args: Value) -> Result<String> {
        Ok(args.to_string())
    }
}

// ============= Planner =============

/// Plans one task per configured topic.
pub struct StubPlanner {
    topics: Vec<String>,
    max_task_count: usize,
}

impl StubPlanner {
    pub fn new<S: Into<String>>(topics: impl IntoIterator<Item = S>) -> Self {
        let topics: Vec<String> = topics.into_iter().map(Into::into).collect();
        let max_task_count = topics.len().max(1);
        Self {
            topics,
            max_task_count,
        }
    }

    pub fn with_max_task_count(mut self, max: usize) -> Self {
        self.max_task_count = max;
        self
    }
}

#[async_trait]
impl Planner for StubPlanner {
    async fn plan(&self, _brief: &Brief) -> Result<Plan> {
        Ok(Plan {
            tasks: self.topics.iter().map(|t| TaskUnit::new(t.clone(), "")).collect(),
            max_task_count: self.max_task_count,
        })
    }
}

pub struct FailingPlanner;

#[async_trait]
impl Planner for FailingPlanner {
    async fn plan(&self, _brief: &Brief) -> Result<Plan> {
        Err(AppError::LLM("planner unavailable".to_string()))
    }
}

// ============= Scorer =============

/// Ranks findings alphabetically by headline and names scripted gaps.
///
/// Pass `n` (0-based) reports `gaps[n]`, and nothing once the script runs out.
pub struct StubScorer {
    gaps: Vec<Vec<InformationGap>>,
    insatiable: bool,
    fail: bool,
    passes: AtomicUsize,
    seen: Mutex<Vec<usize>>,
}

impl StubScorer {
    pub fn new() -> Self {
        Self {
            gaps: Vec::new(),
            insatiable: false,
            fail: false,
            passes: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_gaps(mut self, gaps: Vec<Vec<InformationGap>>) -> Self {
        self.gaps = gaps;
        self
    }

    /// Names a gap on every pass, each under a fresh topic so none is
    /// skipped as already researched.
    pub fn insatiable() -> Self {
        Self {
            insatiable: true,
            ..Self::new()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn passes(&self) -> usize {
        self.passes.load(Ordering::SeqCst)
    }

    /// Number of findings seen on each pass.
    pub fn seen(&self) -> Vec<usize> {
        self.seen.lock().clone()
    }
}

impl Default for StubScorer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scorer for StubScorer {
    async fn score(&self, findings: &[Finding], _profile: &str) -> Result<Scorecard> {
        let pass = self.passes.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(findings.len());
        if self.fail {
            return Err(AppError::LLM("scorer unavailable".to_string()));
        }

        let mut ranked = findings.to_vec();
        ranked.sort_by(|a, b| a.headline.cmp(&b.headline));

        let gaps = if self.insatiable {
            vec![InformationGap::new(format!("follow-up {}", pass), "dig deeper")]
        } else {
            self.gaps.get(pass).cloned().unwrap_or_default()
        };
        Ok(Scorecard { ranked, gaps })
    }
}

// ============= Composer =============

/// Renders one `## headline` section per finding.
pub struct ConcatComposer {
    received: Mutex<Option<Vec<Finding>>>,
}

impl ConcatComposer {
    pub fn new() -> Self {
        Self {
            received: Mutex::new(None),
        }
    }

    pub fn received(&self) -> Option<Vec<Finding>> {
        self.received.lock().clone()
    }
}

impl Default for ConcatComposer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Composer for ConcatComposer {
    async fn compose(&self, findings: &[Finding], style: &StyleConfig) -> Result<String> {
        *self.received.lock() = Some(findings.to_vec());
        let mut document = format!("# Thinkle for {}\n", style.date);
        for finding in findings {
            document.push_str(&format!("\n## {}\n\n{}\n", finding.headline, finding.summary));
        }
        Ok(document)
    }
}

pub struct FailingComposer;

#[async_trait]
impl Composer for FailingComposer {
    async fn compose(&self, _findings: &[Finding], _style: &StyleConfig) -> Result<String> {
        Err(AppError::LLM("composer unavailable".to_string()))
    }
}
