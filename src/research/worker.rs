//! Tool-Invocation Loop
//!
//! Drives one worker through "decide → invoke → observe" rounds:
//!
//! 1. Ask the decision-maker for the next step, given the history so far
//! 2. Invoke the requested capabilities and append the raw results
//! 3. Repeat until it stops or the iteration cap forces a stop
//! 4. Ask for the structured findings and parse them in two stages
//!
//! Capability calls are never retried. Failed calls become observations
//! unless `stop_on_capability_error` is set.

use crate::agents::{Decision, DecisionMaker};
use crate::research::parse::parse_findings;
use crate::tools::CapabilityRegistry;
use crate::types::{Exchange, Finding, LoopError, ParseConfidence, TaskUnit, ToolCall};
use crate::utils::toml_config::PipelineSettings;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

/// Configuration for one worker's loop.
#[derive(Debug, Clone)]
pub struct ToolLoopConfig {
    /// Maximum capability rounds (not individual calls) before the stop is forced.
    pub max_iterations: usize,

    /// Timeout for a single capability call.
    pub capability_timeout: Duration,

    /// Invoke the calls of one round concurrently instead of in order.
    pub parallel_capabilities: bool,

    /// End the worker on the first failed call instead of recording it.
    pub stop_on_capability_error: bool,
}

impl Default for ToolLoopConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            capability_timeout: Duration::from_secs(30),
            parallel_capabilities: false,
            stop_on_capability_error: false,
        }
    }
}

impl ToolLoopConfig {
    pub fn from_settings(settings: &PipelineSettings) -> Self {
        Self {
            max_iterations: settings.max_tool_iterations,
            capability_timeout: Duration::from_secs(settings.capability_timeout_secs),
            parallel_capabilities: settings.parallel_capabilities,
            stop_on_capability_error: settings.stop_on_capability_error,
        }
    }
}

/// Why the capability rounds ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The decision-maker chose to stop.
    Stop,
    /// The iteration cap forced the stop.
    MaxIterations,
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FinishReason::Stop => write!(f, "stop"),
            FinishReason::MaxIterations => write!(f, "max_iterations"),
        }
    }
}

/// State of one worker. Owned by its loop and never shared.
#[derive(Debug)]
pub struct WorkerState {
    task: TaskUnit,
    history: Vec<Exchange>,
    iterations: usize,
    findings: Vec<Finding>,
}

impl WorkerState {
    fn new(task: TaskUnit) -> Self {
        Self {
            task,
            history: Vec::new(),
            iterations: 0,
            findings: Vec::new(),
        }
    }

    pub fn task(&self) -> &TaskUnit {
        &self.task
    }

    pub fn history(&self) -> &[Exchange] {
        &self.history
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }
}

/// Result of a worker that produced structured output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerReport {
    pub task_id: Uuid,
    pub findings: Vec<Finding>,
    /// Capability rounds performed.
    pub iterations: usize,
    pub finish: FinishReason,
    pub confidence: ParseConfidence,
    pub history: Vec<Exchange>,
}

/// Runs workers against a decision-maker and a capability registry.
#[derive(Clone)]
pub struct ToolLoop {
    decision_maker: Arc<dyn DecisionMaker>,
    capabilities: Arc<CapabilityRegistry>,
    config: ToolLoopConfig,
}

impl ToolLoop {
    pub fn new(
        decision_maker: Arc<dyn DecisionMaker>,
        capabilities: Arc<CapabilityRegistry>,
        config: ToolLoopConfig,
    ) -> Self {
        Self {
            decision_maker,
            capabilities,
            config,
        }
    }

    pub fn config(&self) -> &ToolLoopConfig {
        &self.config
    }

    /// Run one worker to completion.
    ///
    /// Returns `LoopError::Cancelled` as soon as `cancel` fires; outstanding
    /// collaborator and capability calls are dropped.
    pub async fn run(
        &self,
        task: TaskUnit,
        cancel: &CancellationToken,
    ) -> Result<WorkerReport, LoopError> {
        let span = tracing::info_span!("worker", task = %task.topic, task_id = %task.id);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(LoopError::Cancelled),
            result = self.drive(WorkerState::new(task)).instrument(span) => result,
        }
    }

    async fn drive(&self, mut state: WorkerState) -> Result<WorkerReport, LoopError> {
        let definitions = self.capabilities.definitions();
        let cap = self.config.max_iterations;

        let (output, finish) = loop {
            if state.iterations >= cap {
                tracing::debug!(cap, "iteration cap reached, forcing stop");
                break (None, FinishReason::MaxIterations);
            }

            let decision = self
                .decision_maker
                .decide(&state.task, &state.history, &definitions)
                .await
                .map_err(|e| LoopError::Collaborator(e.to_string()))?;

            match decision {
                Decision::Invoke(calls) if !calls.is_empty() => {
                    state.iterations += 1;
                    tracing::debug!(
                        round = state.iterations,
                        calls = calls.len(),
                        "invoking capabilities"
                    );
                    let exchanges = self.invoke_round(state.iterations, &calls).await?;
                    state.history.extend(exchanges);
                }
                Decision::Invoke(_) => break (None, FinishReason::Stop),
                Decision::Stop { output } => break (output, FinishReason::Stop),
            }
        };

        let raw = match output {
            Some(raw) => raw,
            None => self.conclude(&state, finish).await?,
        };

        let parsed = parse_findings(&raw).map_err(|e| LoopError::MalformedOutput {
            reason: e.reason,
            raw: raw.clone(),
        })?;
        if parsed.confidence == ParseConfidence::Salvaged {
            tracing::warn!("worker output failed strict validation, findings salvaged");
        }

        let task = &state.task;
        state.findings = parsed
            .findings
            .into_iter()
            .map(|finding| finding.from_task(task))
            .collect();

        tracing::debug!(
            iterations = state.iterations,
            findings = state.findings.len(),
            %finish,
            "worker finished"
        );

        Ok(WorkerReport {
            task_id: state.task.id,
            findings: state.findings,
            iterations: state.iterations,
            finish,
            confidence: parsed.confidence,
            history: state.history,
        })
    }

    /// Ask for structured output once the rounds are over.
    async fn conclude(&self, state: &WorkerState, finish: FinishReason) -> Result<String, LoopError> {
        let decision = self
            .decision_maker
            .conclude(&state.task, &state.history)
            .await
            .map_err(|e| LoopError::Collaborator(e.to_string()))?;

        match decision {
            Decision::Stop { output: Some(raw) } => Ok(raw),
            Decision::Stop { output: None } => Err(LoopError::MalformedOutput {
                reason: "decision-maker produced no output".to_string(),
                raw: String::new(),
            }),
            Decision::Invoke(_) if finish == FinishReason::MaxIterations => {
                Err(LoopError::IterationCapReached {
                    cap: self.config.max_iterations,
                })
            }
            Decision::Invoke(calls) => Err(LoopError::MalformedOutput {
                reason: format!(
                    "decision-maker requested {} capability call(s) instead of concluding",
                    calls.len()
                ),
                raw: String::new(),
            }),
        }
    }

    async fn invoke_round(&self, round: usize, calls: &[ToolCall]) -> Result<Vec<Exchange>, LoopError> {
        let exchanges = if self.config.parallel_capabilities {
            join_all(calls.iter().map(|call| self.invoke_one(round, call))).await
        } else {
            let mut exchanges = Vec::with_capacity(calls.len());
            for call in calls {
                let exchange = self.invoke_one(round, call).await;
                let failed = !exchange.success;
                exchanges.push(exchange);
                if failed && self.config.stop_on_capability_error {
                    break;
                }
            }
            exchanges
        };

        if self.config.stop_on_capability_error {
            if let Some(failed) = exchanges.iter().find(|e| !e.success) {
                return Err(LoopError::CapabilityFailure {
                    capability: failed.call.name.clone(),
                    message: failed.output.clone(),
                });
            }
        }
        Ok(exchanges)
    }

    /// Invoke a single capability with timeout. Failures become observations.
    async fn invoke_one(&self, round: usize, call: &ToolCall) -> Exchange {
        let start = Instant::now();
        let result = timeout(
            self.config.capability_timeout,
            self.capabilities.invoke(&call.name, call.arguments.clone()),
        )
        .await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let (output, success) = match result {
            Ok(Ok(output)) => (output, true),
            Ok(Err(e)) => {
                tracing::warn!(capability = %call.name, error = %e, "capability failed");
                (format!("error: {}", e), false)
            }
            Err(_) => {
                tracing::warn!(capability = %call.name, "capability timed out");
                (
                    format!(
                        "error: capability timed out after {}s",
                        self.config.capability_timeout.as_secs_f32()
                    ),
                    false,
                )
            }
        };

        Exchange {
            round,
            call: call.clone(),
            output,
            success,
            duration_ms,
        }
    }
}
