use crate::types::{Finding, PipelineError, TaskUnit};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A change returned by a stage, applied by the orchestrator.
#[derive(Debug, Clone)]
pub enum StateDelta {
    /// Tasks appended to the task-unit list (planning, follow-up research).
    TasksAdded(Vec<TaskUnit>),
    /// Findings merged into the accumulated set.
    FindingsAdded(Vec<Finding>),
    /// One follow-up research cycle finished.
    RefinementCycleCompleted,
    /// The composer produced the final document.
    DocumentComposed(String),
}

/// Shared state of one pipeline run.
///
/// Only the orchestrator holds it mutably. Stages see an immutable
/// [`snapshot`](Self::snapshot) and hand back deltas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    task_units: Vec<TaskUnit>,
    findings: Vec<Finding>,
    refinement_cycles: u32,
    max_refinement_cycles: u32,
    final_document: Option<String>,
}

impl PipelineState {
    pub fn new(max_refinement_cycles: u32) -> Self {
        Self {
            task_units: Vec::new(),
            findings: Vec::new(),
            refinement_cycles: 0,
            max_refinement_cycles,
            final_document: None,
        }
    }

    pub fn task_units(&self) -> &[TaskUnit] {
        &self.task_units
    }

    /// Every finding collected so far. Never shrinks.
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn refinement_cycles(&self) -> u32 {
        self.refinement_cycles
    }

    pub fn max_refinement_cycles(&self) -> u32 {
        self.max_refinement_cycles
    }

    pub fn final_document(&self) -> Option<&str> {
        self.final_document.as_deref()
    }

    pub fn snapshot(&self) -> Arc<PipelineState> {
        Arc::new(self.clone())
    }

    /// Apply one delta, refusing any that would break the state's invariants.
    pub fn apply(&mut self, delta: StateDelta) -> Result<(), PipelineError> {
        if self.final_document.is_some() {
            return Err(PipelineError::InvariantViolated(
                "state changed after the final document was composed".to_string(),
            ));
        }

        match delta {
            StateDelta::TasksAdded(tasks) => self.task_units.extend(tasks),
            StateDelta::FindingsAdded(findings) => self.findings.extend(findings),
            StateDelta::RefinementCycleCompleted => {
                if self.refinement_cycles >= self.max_refinement_cycles {
                    return Err(PipelineError::InvariantViolated(format!(
                        "refinement cycle {} exceeds the cap of {}",
                        self.refinement_cycles + 1,
                        self.max_refinement_cycles
                    )));
                }
                self.refinement_cycles += 1;
            }
            StateDelta::DocumentComposed(document) => self.final_document = Some(document),
        }
        Ok(())
    }
}
