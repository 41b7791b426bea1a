use crate::research::worker::{ToolLoop, WorkerReport};
use crate::types::{Finding, LoopError, TaskUnit};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// What one worker contributed to a research pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerOutcome {
    pub task_id: Uuid,
    pub topic: String,
    pub findings: Vec<Finding>,
    pub iterations: usize,
    /// Set when the worker failed; its findings are then empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkerOutcome {
    fn completed(task: &TaskUnit, report: WorkerReport) -> Self {
        Self {
            task_id: task.id,
            topic: task.topic.clone(),
            findings: report.findings,
            iterations: report.iterations,
            error: None,
        }
    }

    fn failed(task: &TaskUnit, error: impl Into<String>) -> Self {
        Self {
            task_id: task.id,
            topic: task.topic.clone(),
            findings: Vec::new(),
            iterations: 0,
            error: Some(error.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Merged result of one research pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchOutput {
    /// Findings of every successful worker, grouped in task order.
    pub findings: Vec<Finding>,
    /// One outcome per task, in task order.
    pub outcomes: Vec<WorkerOutcome>,
}

impl ResearchOutput {
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }
}

/// The research pass was cancelled. Nothing it collected is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("research stage cancelled")]
pub struct StageCancelled;

/// Fans tasks out to concurrent workers and joins them.
#[derive(Clone)]
pub struct ResearchStage {
    tool_loop: ToolLoop,
}

impl ResearchStage {
    pub fn new(tool_loop: ToolLoop) -> Self {
        Self { tool_loop }
    }

    /// Run one worker per task and wait for all of them.
    ///
    /// Worker failures are tolerated and reported in the outcomes. If `cancel`
    /// fires first every in-flight worker is aborted and `StageCancelled` is
    /// returned.
    pub async fn run(
        &self,
        tasks: &[TaskUnit],
        cancel: &CancellationToken,
    ) -> Result<ResearchOutput, StageCancelled> {
        if cancel.is_cancelled() {
            return Err(StageCancelled);
        }

        tracing::info!(workers = tasks.len(), "research stage started");

        let mut set = JoinSet::new();
        for (index, task) in tasks.iter().cloned().enumerate() {
            let worker = self.tool_loop.clone();
            let token = cancel.clone();
            set.spawn(async move { (index, worker.run(task, &token).await) });
        }

        // Slots keep the merge independent of completion order
        let mut slots: Vec<Option<WorkerOutcome>> = tasks.iter().map(|_| None).collect();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    set.abort_all();
                    tracing::warn!(in_flight = set.len(), "research stage cancelled");
                    return Err(StageCancelled);
                }
                joined = set.join_next() => match joined {
                    Some(Ok((index, result))) => {
                        slots[index] = Some(Self::outcome(&tasks[index], result));
                    }
                    Some(Err(e)) => {
                        tracing::error!(error = %e, "worker task did not complete");
                    }
                    None => break,
                },
            }
        }

        let outcomes: Vec<WorkerOutcome> = slots
            .into_iter()
            .zip(tasks)
            .map(|(slot, task)| {
                slot.unwrap_or_else(|| WorkerOutcome::failed(task, "worker task panicked"))
            })
            .collect();

        let findings = outcomes
            .iter()
            .flat_map(|o| o.findings.iter().cloned())
            .collect();

        let output = ResearchOutput { findings, outcomes };
        tracing::info!(
            findings = output.findings.len(),
            failed = output.failures(),
            "research stage finished"
        );
        Ok(output)
    }

    fn outcome(task: &TaskUnit, result: Result<WorkerReport, LoopError>) -> WorkerOutcome {
        match result {
            Ok(report) => WorkerOutcome::completed(task, report),
            Err(e) => {
                tracing::warn!(task = %task.topic, error = %e, "worker failed");
                if let Some(raw) = e.raw_output() {
                    tracing::debug!(task = %task.topic, %raw, "unparsed worker output");
                }
                WorkerOutcome::failed(task, e.to_string())
            }
        }
    }
}
