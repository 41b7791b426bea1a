//! Pipeline Orchestration
//!
//! The pipeline has a fixed shape: plan, research in parallel, refine, compose.
//! Refinement may send narrower tasks back through research, bounded by
//! `max_refinement_cycles`, so every run terminates.
//!
//! # Configuration
//!
//! Bounds come from the `[pipeline]` table of `thinkle.toml`:
//!
//! ```toml
//! [pipeline]
//! max_tool_iterations = 3
//! max_refinement_cycles = 1
//! run_timeout_secs = 600
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let orchestrator = Orchestrator::new(planner, research, scorer, composer, config);
//! let output = orchestrator.run(&brief).await?;
//! println!("{}", output.document);
//! for step in &output.stages {
//!     println!("{}: {} ({} ms)", step.stage, step.detail, step.duration_ms);
//! }
//! ```

pub mod engine;
pub mod refinement;
pub mod state;

pub use engine::{Orchestrator, OrchestratorConfig, PipelineOutput, StageRecord};
pub use refinement::{RefinementConfig, RefinementOutcome, RefinementStage};
pub use state::{PipelineState, StateDelta};
