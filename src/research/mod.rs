//! Parallel Research
//!
//! Each research task is handled by one worker running the tool-invocation
//! loop. The research stage fans the workers out on a [`tokio::task::JoinSet`]
//! and merges whatever they produce.
//!
//! # Architecture
//!
//! - [`worker::ToolLoop`] - drives one worker through capability rounds, bounded by an iteration cap
//! - [`parse`] - strict-then-salvage parsing of the worker's structured reply
//! - [`stage::ResearchStage`] - concurrent fan-out with a join barrier and atomic cancellation
//!
//! # Usage
//!
//! ```ignore
//! use thinkle::research::{ResearchStage, ToolLoop, ToolLoopConfig};
//!
//! let stage = ResearchStage::new(ToolLoop::new(decision_maker, registry, ToolLoopConfig::default()));
//! let output = stage.run(&tasks, &cancel).await?;
//!
//! for outcome in &output.outcomes {
//!     println!("{}: {} finding(s)", outcome.topic, outcome.findings.len());
//! }
//! ```
//!
//! A failing worker contributes zero findings and never affects its siblings.

/// Two-stage parsing of collaborator output.
pub mod parse;
/// Research stage fan-out and merge.
pub mod stage;
/// Tool-invocation loop for a single worker.
pub mod worker;

pub use stage::{ResearchOutput, ResearchStage, StageCancelled, WorkerOutcome};
pub use worker::{FinishReason, ToolLoop, ToolLoopConfig, WorkerReport};
