//! # Thinkle - a bounded multi-agent research pipeline
//!
//! Thinkle turns a list of interests into a newsletter. A run has a fixed shape:
//!
//! 1. **Planning** - a planner turns the brief into research tasks
//! 2. **Research** - one worker per task, all running concurrently, each in a
//!    tool-invocation loop capped at `max_tool_iterations` rounds
//! 3. **Refinement** - a scorer ranks the findings and may name gaps, which
//!    are researched again at most `max_refinement_cycles` times
//! 4. **Composition** - a composer writes the final Markdown document
//!
//! Every loop is bounded, so every run terminates. Cancellation (Ctrl-C or
//! the run deadline) is atomic per stage: a cancelled research stage merges
//! nothing into the pipeline state.
//!
//! ## Library Usage
//!
//! ```rust,ignore
//! use thinkle::{cli::run::build_orchestrator, agents::Brief, ThinkleConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ThinkleConfig::load("thinkle.toml")?;
//!     let orchestrator = build_orchestrator(&config)?;
//!     let output = orchestrator.run(&Brief::from_config(&config)).await?;
//!     println!("{}", output.document);
//!     Ok(())
//! }
//! ```
//!
//! The stages only depend on the collaborator traits in [`agents`]
//! ([`agents::Planner`], [`agents::DecisionMaker`], [`agents::Scorer`],
//! [`agents::Composer`]) and on [`tools::Capability`], so any of them can be
//! replaced with a scripted implementation.
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `web-search` | DuckDuckGo search and page fetching via daedra (default) |
//!
//! ## Modules
//!
//! - [`agents`] - Collaborator traits, the brief, prompts and LLM-backed agents
//! - [`cli`] - Command-line interface
//! - [`llm`] - LLM provider clients (Ollama, OpenAI-compatible)
//! - [`research`] - Tool-invocation loop and the parallel research stage
//! - [`tools`] - Capabilities (web search, Reddit, arXiv) and their registry
//! - [`workflows`] - Pipeline state, refinement and the orchestrator
//! - [`types`] - Task units, findings and error types

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// Collaborator traits and the agents that implement them.
pub mod agents;
/// Command-line interface.
pub mod cli;
/// LLM provider clients and abstractions.
pub mod llm;
/// Research workers and the parallel research stage.
pub mod research;
/// Capabilities available to research workers.
pub mod tools;
/// Core types (tasks, findings, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;
/// Pipeline orchestration.
pub mod workflows;

// Re-export commonly used types
pub use agents::{Brief, Composer, DecisionMaker, Planner, Scorer};
pub use llm::{LLMClient, LLMResponse, Provider};
pub use research::{ResearchStage, ToolLoop, ToolLoopConfig};
pub use tools::{Capability, CapabilityRegistry};
pub use types::{AppError, Finding, PipelineError, Result, TaskUnit};
pub use utils::toml_config::{ConfigError, ThinkleConfig};
pub use workflows::{Orchestrator, OrchestratorConfig, PipelineOutput};
