//! Collaborators that supply the pipeline's judgment.
//!
//! The engine only sees these traits. [`llm`] holds the model-backed
//! implementations; tests plug in scripted ones.

pub mod llm;
pub mod prompts;

use crate::types::{Exchange, Finding, InformationGap, Result, TaskUnit, ToolCall, ToolDefinition};
use crate::utils::toml_config::{Frequency, ThinkleConfig, Tone};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use llm::{LlmComposer, LlmDecisionMaker, LlmPlanner, LlmScorer};

// ============= Inputs =============

/// Writing style handed to the composer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleConfig {
    pub tone: Tone,
    pub include_opinions: bool,
    pub include_sources: bool,
    pub frequency: Frequency,
    pub date: NaiveDate,
}

/// Everything the pipeline needs to know about one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brief {
    pub interests: Vec<String>,
    pub user_profile: String,
    pub max_tasks: usize,
    /// Ranked findings handed to the composer are cut to this many.
    pub max_stories: usize,
    pub style: StyleConfig,
}

impl Brief {
    pub fn from_config(config: &ThinkleConfig) -> Self {
        Self {
            interests: config.interests.clone(),
            user_profile: config.user_profile.clone(),
            max_tasks: config.max_tasks,
            max_stories: config.newsletter.max_stories,
            style: StyleConfig {
                tone: config.newsletter.tone,
                include_opinions: config.newsletter.include_opinions,
                include_sources: config.output.include_sources,
                frequency: config.newsletter.frequency,
                date: chrono::Local::now().date_naive(),
            },
        }
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.style.date = date;
        self
    }
}

// ============= Outputs =============

/// What the decision-maker wants next.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Invoke these capabilities and report back. An empty list means stop.
    Invoke(Vec<ToolCall>),
    /// Stop. `output` carries the structured reply when it came with the stop.
    Stop { output: Option<String> },
}

impl Decision {
    pub fn stop_with(output: impl Into<String>) -> Self {
        Decision::Stop {
            output: Some(output.into()),
        }
    }
}

/// Task list produced by the planner.
#[derive(Debug, Clone)]
pub struct Plan {
    pub tasks: Vec<TaskUnit>,
    /// Upper bound on concurrent workers for this run.
    pub max_task_count: usize,
}

/// Result of one scoring pass.
#[derive(Debug, Clone, Default)]
pub struct Scorecard {
    /// Findings in rank order, best first.
    pub ranked: Vec<Finding>,
    pub gaps: Vec<InformationGap>,
}

// ============= Traits =============

/// Steers one worker through its capability rounds.
#[async_trait]
pub trait DecisionMaker: Send + Sync {
    /// Choose the next step given the history so far.
    async fn decide(
        &self,
        task: &TaskUnit,
        history: &[Exchange],
        capabilities: &[ToolDefinition],
    ) -> Result<Decision>;

    /// Produce the structured reply after the loop stopped.
    async fn conclude(&self, task: &TaskUnit, history: &[Exchange]) -> Result<Decision>;
}

/// Splits a brief into research tasks. Invoked once per run.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, brief: &Brief) -> Result<Plan>;
}

/// Ranks findings and names gaps worth another research cycle.
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score(&self, findings: &[Finding], profile: &str) -> Result<Scorecard>;

    /// Whether two findings report the same story.
    fn equivalent(&self, a: &Finding, b: &Finding) -> bool {
        normalize_headline(&a.headline) == normalize_headline(&b.headline)
    }
}

/// Writes the final document. Invoked once per run.
#[async_trait]
pub trait Composer: Send + Sync {
    async fn compose(&self, findings: &[Finding], style: &StyleConfig) -> Result<String>;
}

/// Lowercase alphanumeric words joined by single spaces.
pub fn normalize_headline(headline: &str) -> String {
    headline
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullScorer;

    #[async_trait]
    impl Scorer for NullScorer {
        async fn score(&self, findings: &[Finding], _profile: &str) -> Result<Scorecard> {
            Ok(Scorecard {
                ranked: findings.to_vec(),
                gaps: Vec::new(),
            })
        }
    }

    #[test]
    fn test_normalize_headline() {
        assert_eq!(
            normalize_headline("  OpenAI ships   GPT-5!  "),
            "openai ships gpt 5"
        );
        assert_eq!(normalize_headline("..."), "");
    }

    #[test]
    fn test_default_equivalence_ignores_case_and_punctuation() {
        let scorer = NullScorer;
        let a = Finding::new("Rust 2.0 Released", "a");
        let b = Finding::new("rust 2.0 released.", "b");
        let c = Finding::new("Rust 1.91 Released", "c");
        assert!(scorer.equivalent(&a, &b));
        assert!(!scorer.equivalent(&a, &c));
    }

    #[test]
    fn test_brief_from_config() {
        let config = ThinkleConfig::example();
        let date = NaiveDate::from_ymd_opt(2025, 9, 26).unwrap();
        let brief = Brief::from_config(&config).with_date(date);
        assert_eq!(brief.interests, config.interests);
        assert_eq!(brief.max_tasks, config.max_tasks);
        assert_eq!(brief.max_stories, config.newsletter.max_stories);
        assert_eq!(brief.style.date, date);
        assert_eq!(brief.style.tone, config.newsletter.tone);
    }
}
