//! Refinement Stage
//!
//! A small state machine: `Scoring → (AwaitingFollowUp → Scoring)* → Done`.
//! The cycle counter is checked before every re-entry, so the scorer runs
//! at most `max_cycles + 1` times however many gaps it keeps naming.

use crate::agents::{normalize_headline, Scorer};
use crate::research::ResearchStage;
use crate::types::{Finding, InformationGap, PipelineError, Stage, TaskUnit};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy)]
pub struct RefinementConfig {
    /// Follow-up research cycles allowed.
    pub max_cycles: u32,
    /// Follow-up tasks dispatched per cycle, at most.
    pub max_concurrent_tasks: usize,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            max_cycles: 1,
            max_concurrent_tasks: 1,
        }
    }
}

#[derive(Debug)]
enum RefinementState {
    Scoring,
    AwaitingFollowUp(Vec<InformationGap>),
    Done,
}

/// Result of the refinement stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefinementOutcome {
    /// Findings from the last scoring pass, deduplicated, best first.
    pub ranked: Vec<Finding>,
    /// Follow-up tasks that were dispatched, if any.
    pub follow_up: Option<Vec<TaskUnit>>,
    /// Findings produced by follow-up research.
    pub discovered: Vec<Finding>,
    pub cycles: u32,
    pub scoring_passes: u32,
    /// Gaps named by the last scoring pass that were not researched, either
    /// because no cycle was left or because the topic was already covered.
    pub unresolved_gaps: Vec<InformationGap>,
}

pub struct RefinementStage {
    scorer: Arc<dyn Scorer>,
    research: ResearchStage,
    config: RefinementConfig,
}

impl RefinementStage {
    pub fn new(scorer: Arc<dyn Scorer>, research: ResearchStage, config: RefinementConfig) -> Self {
        Self {
            scorer,
            research,
            config,
        }
    }

    /// Score `findings`, chasing named gaps with follow-up research while
    /// cycles remain.
    ///
    /// `researched` lists the tasks already run; gaps on the same topic are
    /// not researched again.
    pub async fn run(
        &self,
        findings: &[Finding],
        researched: &[TaskUnit],
        profile: &str,
        cancel: &CancellationToken,
    ) -> Result<RefinementOutcome, PipelineError> {
        let mut accumulated = findings.to_vec();
        let mut seen_topics: HashSet<String> = researched
            .iter()
            .map(|t| normalize_headline(&t.topic))
            .collect();
        let mut outcome = RefinementOutcome::default();
        let mut dispatched: Vec<TaskUnit> = Vec::new();
        let mut state = RefinementState::Scoring;

        loop {
            state = match state {
                RefinementState::Scoring => {
                    outcome.scoring_passes += 1;
                    let card = self.scorer.score(&accumulated, profile).await.map_err(|e| {
                        PipelineError::FatalCollaboratorError {
                            stage: Stage::Refinement,
                            message: e.to_string(),
                        }
                    })?;
                    outcome.ranked = dedupe(self.scorer.as_ref(), card.ranked);

                    tracing::info!(
                        pass = outcome.scoring_passes,
                        ranked = outcome.ranked.len(),
                        gaps = card.gaps.len(),
                        "scoring pass finished"
                    );

                    if card.gaps.is_empty() {
                        outcome.unresolved_gaps.clear();
                        RefinementState::Done
                    } else if outcome.cycles >= self.config.max_cycles {
                        tracing::info!(cap = self.config.max_cycles, "refinement cap reached");
                        outcome.unresolved_gaps = card.gaps;
                        RefinementState::Done
                    } else {
                        RefinementState::AwaitingFollowUp(card.gaps)
                    }
                }
                RefinementState::AwaitingFollowUp(gaps) => {
                    let mut tasks = Vec::new();
                    let mut skipped = Vec::new();
                    for gap in gaps {
                        if tasks.len() >= self.config.max_concurrent_tasks {
                            break;
                        }
                        if seen_topics.insert(normalize_headline(&gap.topic)) {
                            tasks.push(gap.into_task());
                        } else {
                            tracing::debug!(topic = %gap.topic, "gap already researched, skipping");
                            skipped.push(gap);
                        }
                    }

                    if tasks.is_empty() {
                        outcome.unresolved_gaps = skipped;
                        RefinementState::Done
                    } else {
                        let output = self.research.run(&tasks, cancel).await.map_err(|_| {
                            PipelineError::Cancelled {
                                stage: Stage::Refinement,
                            }
                        })?;
                        accumulated.extend(output.findings.iter().cloned());
                        outcome.discovered.extend(output.findings);
                        dispatched.extend(tasks);
                        outcome.cycles += 1;
                        RefinementState::Scoring
                    }
                }
                RefinementState::Done => break,
            };
        }

        if !dispatched.is_empty() {
            outcome.follow_up = Some(dispatched);
        }
        Ok(outcome)
    }
}

/// Collapse duplicates in a ranked list.
///
/// Two findings are duplicates when their tags intersect and the scorer
/// judges them equivalent. The higher-ranked one is kept and absorbs the
/// other's sources.
pub fn dedupe(scorer: &dyn Scorer, ranked: Vec<Finding>) -> Vec<Finding> {
    let mut kept: Vec<Finding> = Vec::with_capacity(ranked.len());
    for finding in ranked {
        match kept
            .iter_mut()
            .find(|k| k.shares_tag_with(&finding) && scorer.equivalent(k, &finding))
        {
            Some(existing) => existing.absorb_sources(&finding),
            None => kept.push(finding),
        }
    }
    kept
}
