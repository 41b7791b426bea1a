//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod mocks;

use mocks::{EchoCapability, ScriptedDecisionMaker};
use std::sync::Arc;
use std::time::Duration;
use thinkle::agents::{Brief, Composer, Planner, Scorer};
use thinkle::research::{ResearchStage, ToolLoop, ToolLoopConfig};
use thinkle::tools::CapabilityRegistry;
use thinkle::workflows::{Orchestrator, OrchestratorConfig};
use thinkle::ThinkleConfig;

/// A brief built from the example configuration with a fixed date.
pub fn brief() -> Brief {
    let date = chrono::NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
    Brief::from_config(&ThinkleConfig::example()).with_date(date)
}

/// Registry holding a single `echo` capability.
pub fn echo_registry() -> Arc<CapabilityRegistry> {
    let mut registry = CapabilityRegistry::new();
    registry.register(Arc::new(EchoCapability));
    Arc::new(registry)
}

pub fn loop_config(max_iterations: usize) -> ToolLoopConfig {
    ToolLoopConfig {
        max_iterations,
        capability_timeout: Duration::from_secs(5),
        parallel_capabilities: false,
        stop_on_capability_error: false,
    }
}

/// Research stage driven by `decision_maker` against [`echo_registry`].
pub fn research_stage(decision_maker: Arc<ScriptedDecisionMaker>, max_iterations: usize) -> ResearchStage {
    ResearchStage::new(ToolLoop::new(
        decision_maker,
        echo_registry(),
        loop_config(max_iterations),
    ))
}

pub struct Collaborators {
    pub planner: Arc<dyn Planner>,
    pub decision_maker: Arc<ScriptedDecisionMaker>,
    pub scorer: Arc<dyn Scorer>,
    pub composer: Arc<dyn Composer>,
}

pub fn orchestrator(
    parts: Collaborators,
    max_iterations: usize,
    max_refinement_cycles: u32,
    run_timeout: Option<Duration>,
) -> Orchestrator {
    Orchestrator::new(
        parts.planner,
        research_stage(parts.decision_maker, max_iterations),
        parts.scorer,
        parts.composer,
        OrchestratorConfig {
            max_refinement_cycles,
            run_timeout,
        },
    )
}
