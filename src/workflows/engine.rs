//! Orchestrator
//!
//! Runs the fixed pipeline Planning → Research → Refinement → Composition,
//! owning the [`PipelineState`] and applying each stage's delta in turn.

use crate::agents::{Brief, Composer, Planner, Scorer};
use crate::research::ResearchStage;
use crate::types::{Finding, PipelineError, Stage};
use crate::utils::toml_config::ThinkleConfig;
use crate::workflows::refinement::{RefinementConfig, RefinementStage};
use crate::workflows::state::{PipelineState, StateDelta};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfig {
    pub max_refinement_cycles: u32,
    /// Deadline for a whole run.
    pub run_timeout: Option<Duration>,
}

impl OrchestratorConfig {
    pub fn from_config(config: &ThinkleConfig) -> Self {
        Self {
            max_refinement_cycles: config.pipeline.max_refinement_cycles,
            run_timeout: config.run_timeout(),
        }
    }
}

/// A single stage in the run's reasoning path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub duration_ms: u64,
    /// Short human-readable summary of what the stage did
    pub detail: String,
}

/// Output from a completed run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub document: String,
    /// Findings handed to the composer, best first
    pub ranked: Vec<Finding>,
    pub state: PipelineState,
    pub stages: Vec<StageRecord>,
}

/// Sequences the four stages of a run.
pub struct Orchestrator {
    planner: Arc<dyn Planner>,
    scorer: Arc<dyn Scorer>,
    composer: Arc<dyn Composer>,
    research: ResearchStage,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        planner: Arc<dyn Planner>,
        research: ResearchStage,
        scorer: Arc<dyn Scorer>,
        composer: Arc<dyn Composer>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            planner,
            scorer,
            composer,
            research,
            config,
        }
    }

    /// Run the pipeline to completion.
    pub async fn run(&self, brief: &Brief) -> Result<PipelineOutput, PipelineError> {
        self.run_with_cancel(brief, CancellationToken::new()).await
    }

    /// Run the pipeline, aborting when `cancel` fires or the run deadline passes.
    ///
    /// Cancellation is atomic per stage: findings of workers that finished in
    /// the interrupted stage are discarded.
    pub async fn run_with_cancel(
        &self,
        brief: &Brief,
        cancel: CancellationToken,
    ) -> Result<PipelineOutput, PipelineError> {
        let token = cancel.child_token();
        let started = Instant::now();

        let deadline = self.config.run_timeout.map(|limit| {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(limit).await;
                token.cancel();
            })
        });

        let result = self.execute(brief, &token).await;
        if let Some(handle) = deadline {
            handle.abort();
        }

        result.map_err(|e| match (e, self.config.run_timeout) {
            (PipelineError::Cancelled { stage }, Some(limit)) if started.elapsed() >= limit => {
                PipelineError::TimedOut { stage, limit }
            }
            (e, _) => e,
        })
    }

    async fn execute(
        &self,
        brief: &Brief,
        token: &CancellationToken,
    ) -> Result<PipelineOutput, PipelineError> {
        let mut state = PipelineState::new(self.config.max_refinement_cycles);
        let mut stages = Vec::with_capacity(4);

        // Planning
        let started = Instant::now();
        let plan = guarded(Stage::Planning, token, self.planner.plan(brief))
            .await?
            .map_err(|e| PipelineError::PlanningFailed(e.to_string()))?;
        let max_tasks = plan.max_task_count;
        let mut tasks = plan.tasks;
        if tasks.len() > max_tasks {
            tracing::warn!(
                planned = tasks.len(),
                max_tasks,
                "planner exceeded its task limit, truncating"
            );
            tasks.truncate(max_tasks);
        }
        if tasks.is_empty() {
            return Err(PipelineError::PlanningFailed(
                "planner produced no research tasks".to_string(),
            ));
        }
        tracing::info!(tasks = tasks.len(), "planning finished");
        stages.push(record(Stage::Planning, started, format!("{} task(s) planned", tasks.len())));
        state.apply(StateDelta::TasksAdded(tasks))?;

        // Research
        let started = Instant::now();
        let snapshot = state.snapshot();
        let output = self
            .research
            .run(snapshot.task_units(), token)
            .await
            .map_err(|_| PipelineError::Cancelled {
                stage: Stage::Research,
            })?;
        stages.push(record(
            Stage::Research,
            started,
            format!(
                "{} finding(s), {} of {} worker(s) failed",
                output.findings.len(),
                output.failures(),
                output.outcomes.len()
            ),
        ));
        state.apply(StateDelta::FindingsAdded(output.findings))?;

        // Refinement
        let started = Instant::now();
        let refinement = RefinementStage::new(
            self.scorer.clone(),
            self.research.clone(),
            RefinementConfig {
                max_cycles: self.config.max_refinement_cycles,
                max_concurrent_tasks: max_tasks,
            },
        );
        let snapshot = state.snapshot();
        let outcome = guarded(
            Stage::Refinement,
            token,
            refinement.run(
                snapshot.findings(),
                snapshot.task_units(),
                &brief.user_profile,
                token,
            ),
        )
        .await??;
        stages.push(record(
            Stage::Refinement,
            started,
            format!(
                "{} ranked, {} scoring pass(es), {} follow-up cycle(s)",
                outcome.ranked.len(),
                outcome.scoring_passes,
                outcome.cycles
            ),
        ));
        if !outcome.unresolved_gaps.is_empty() {
            tracing::info!(
                gaps = outcome.unresolved_gaps.len(),
                "gaps left unresolved after refinement"
            );
        }
        if let Some(follow_up) = outcome.follow_up {
            state.apply(StateDelta::TasksAdded(follow_up))?;
        }
        state.apply(StateDelta::FindingsAdded(outcome.discovered))?;
        for _ in 0..outcome.cycles {
            state.apply(StateDelta::RefinementCycleCompleted)?;
        }

        // Composition
        let started = Instant::now();
        let mut ranked = outcome.ranked;
        if ranked.len() > brief.max_stories {
            ranked.truncate(brief.max_stories);
        }
        let document = guarded(
            Stage::Composition,
            token,
            self.composer.compose(&ranked, &brief.style),
        )
        .await?
        .map_err(|e| PipelineError::CompositionFailed(e.to_string()))?;
        stages.push(record(
            Stage::Composition,
            started,
            format!("{} stories, {} characters", ranked.len(), document.len()),
        ));
        state.apply(StateDelta::DocumentComposed(document.clone()))?;

        tracing::info!(
            findings = state.findings().len(),
            cycles = state.refinement_cycles(),
            "pipeline finished"
        );

        Ok(PipelineOutput {
            document,
            ranked,
            state,
            stages,
        })
    }
}

/// Await `fut` unless the run is cancelled first.
async fn guarded<F: Future>(
    stage: Stage,
    token: &CancellationToken,
    fut: F,
) -> Result<F::Output, PipelineError> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(PipelineError::Cancelled { stage }),
        output = fut => Ok(output),
    }
}

fn record(stage: Stage, started: Instant, detail: String) -> StageRecord {
    StageRecord {
        stage,
        duration_ms: started.elapsed().as_millis() as u64,
        detail,
    }
}
