use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use uuid::Uuid;

// ============= Work Units =============

/// One unit of assigned research work.
///
/// Created by the planner (or by the refinement stage for follow-up gaps) and
/// never modified afterwards. The `id` is how findings point back at the task
/// that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskUnit {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub topic: String,
    #[serde(default, alias = "additional_info")]
    pub context: String,
}

impl TaskUnit {
    pub fn new(topic: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic: topic.into(),
            context: context.into(),
        }
    }
}

/// How much a finding's structure can be trusted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseConfidence {
    /// The collaborator output passed strict schema validation.
    #[default]
    Validated,
    /// Recovered from free-form output by the salvage pass.
    Salvaged,
}

/// One structured piece of researched content with its sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub headline: String,
    pub summary: String,
    /// Source URLs, in the order the worker cited them
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    /// Id of the TaskUnit that produced this finding. Holding the id rather
    /// than the task keeps the reference weak.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_task: Option<Uuid>,
    #[serde(default)]
    pub confidence: ParseConfidence,
}

impl Finding {
    pub fn new(headline: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            headline: headline.into(),
            summary: summary.into(),
            sources: Vec::new(),
            tags: BTreeSet::new(),
            published: None,
            origin_task: None,
            confidence: ParseConfidence::Validated,
        }
    }

    pub fn with_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources = sources.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn from_task(mut self, task: &TaskUnit) -> Self {
        self.origin_task = Some(task.id);
        self
    }

    /// True when the two findings share at least one topic tag.
    pub fn shares_tag_with(&self, other: &Finding) -> bool {
        self.tags.intersection(&other.tags).next().is_some()
    }

    /// Appends the sources of `other` that this finding does not cite yet.
    pub fn absorb_sources(&mut self, other: &Finding) {
        for source in &other.sources {
            if !self.sources.contains(source) {
                self.sources.push(source.clone());
            }
        }
    }
}

/// A gap in the collected research, named by the scorer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InformationGap {
    pub topic: String,
    #[serde(default, alias = "additional_info")]
    pub context: String,
}

impl InformationGap {
    pub fn new(topic: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            context: context.into(),
        }
    }

    pub fn into_task(self) -> TaskUnit {
        TaskUnit::new(self.topic, self.context)
    }
}

// ============= Tool Types =============

/// Schema of one capability, as advertised to the decision-maker.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A capability invocation requested by the decision-maker.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            arguments,
        }
    }
}

/// One capability round-trip in a worker's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exchange {
    /// 1-based round in which the decision-maker requested the call.
    pub round: usize,
    pub call: ToolCall,
    /// Raw capability output, or the error text for a failed call.
    pub output: String,
    pub success: bool,
    pub duration_ms: u64,
}

// ============= Pipeline Stages =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Planning,
    Research,
    Refinement,
    Composition,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Planning => write!(f, "planning"),
            Stage::Research => write!(f, "research"),
            Stage::Refinement => write!(f, "refinement"),
            Stage::Composition => write!(f, "composition"),
        }
    }
}

// ============= Error Types =============

/// Errors raised by external collaborators: model calls, connectors, parsing.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("LLM error: {0}")]
    LLM(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Capability error: {0}")]
    Capability(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Failure of a single worker. Always tolerated by the research stage.
#[derive(Debug, thiserror::Error)]
pub enum LoopError {
    #[error("malformed worker output ({reason})")]
    MalformedOutput { reason: String, raw: String },

    #[error("capability '{capability}' failed: {message}")]
    CapabilityFailure { capability: String, message: String },

    #[error("iteration cap of {cap} reached without structured output")]
    IterationCapReached { cap: usize },

    #[error("decision-maker failed: {0}")]
    Collaborator(String),

    #[error("worker cancelled")]
    Cancelled,
}

impl LoopError {
    /// Raw collaborator text kept for diagnostics, when there is any.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            LoopError::MalformedOutput { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

/// Failure that aborts a whole pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("planning failed: {0}")]
    PlanningFailed(String),

    #[error("composition failed: {0}")]
    CompositionFailed(String),

    #[error("collaborator failed during {stage}: {message}")]
    FatalCollaboratorError { stage: Stage, message: String },

    #[error("run cancelled during {stage}")]
    Cancelled { stage: Stage },

    #[error("run timed out after {limit:?} during {stage}")]
    TimedOut { stage: Stage, limit: Duration },

    #[error("pipeline invariant violated: {0}")]
    InvariantViolated(String),
}

impl PipelineError {
    /// The stage the run was in when it failed, if it is known.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::PlanningFailed(_) => Some(Stage::Planning),
            PipelineError::CompositionFailed(_) => Some(Stage::Composition),
            PipelineError::FatalCollaboratorError { stage, .. }
            | PipelineError::Cancelled { stage }
            | PipelineError::TimedOut { stage, .. } => Some(*stage),
            PipelineError::InvariantViolated(_) => None,
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            PipelineError::Cancelled { .. } | PipelineError::TimedOut { .. }
        )
    }
}
