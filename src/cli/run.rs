//! Run command implementation
//!
//! Wires the configured model provider, connectors and pipeline bounds into an
//! [`Orchestrator`], runs it once and writes the newsletter to disk.

use super::output::Output;
use crate::agents::llm::{LlmComposer, LlmDecisionMaker, LlmPlanner, LlmScorer};
use crate::agents::Brief;
use crate::llm::{LLMClient, Provider};
use crate::research::{ResearchStage, ToolLoop, ToolLoopConfig};
use crate::tools::CapabilityRegistry;
use crate::types::Result;
use crate::utils::toml_config::ThinkleConfig;
use crate::workflows::{Orchestrator, OrchestratorConfig, PipelineOutput};
use anyhow::Context;
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Command-line overrides for a run
#[derive(Debug, Default, Clone)]
pub struct RunOptions {
    pub output_dir: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

impl RunOptions {
    pub fn apply(&self, config: &mut ThinkleConfig) {
        if let Some(dir) = &self.output_dir {
            config.output.directory = dir.clone();
        }
        if let Some(secs) = self.timeout_secs {
            config.pipeline.run_timeout_secs = Some(secs);
        }
    }
}

fn client_for(config: &ThinkleConfig, model: &str) -> Result<Arc<dyn LLMClient>> {
    Provider::from_config(&config.provider, model)?.create_client()
}

/// Build an orchestrator with one model client per role.
pub fn build_orchestrator(config: &ThinkleConfig) -> Result<Orchestrator> {
    let models = &config.models;

    let capabilities = CapabilityRegistry::from_content_config(&config.content);
    if capabilities.is_empty() {
        tracing::warn!("No connectors available, scouts will answer from model knowledge only");
    }

    let loop_config = ToolLoopConfig::from_settings(&config.pipeline);
    let decision_maker = LlmDecisionMaker::new(
        client_for(config, &models.scout)?,
        loop_config.max_iterations,
    );
    let tool_loop = ToolLoop::new(Arc::new(decision_maker), Arc::new(capabilities), loop_config);

    Ok(Orchestrator::new(
        Arc::new(LlmPlanner::new(client_for(config, &models.planner)?)),
        ResearchStage::new(tool_loop),
        Arc::new(LlmScorer::new(client_for(config, &models.evaluator)?)),
        Arc::new(LlmComposer::new(
            client_for(config, &models.writer)?,
            config.user_profile.clone(),
        )),
        OrchestratorConfig::from_config(config),
    ))
}

/// File name of a newsletter generated at `at`.
pub fn newsletter_file_name(at: DateTime<Local>) -> String {
    format!("newsletter-{}.md", at.format("%Y%m%d-%H%M%S"))
}

/// Write `document` into `dir`, creating the directory when missing.
pub fn write_newsletter(dir: &Path, document: &str, at: DateTime<Local>) -> std::io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(newsletter_file_name(at));
    fs::write(&path, document)?;
    Ok(path)
}

/// Run the pipeline once. Ctrl-C cancels the run.
pub async fn run(mut config: ThinkleConfig, options: RunOptions, output: &Output) -> anyhow::Result<PathBuf> {
    options.apply(&mut config);

    output.banner();
    output.header("Generating newsletter");
    output.kv("interests", &config.interests.join(", "));
    output.kv("provider", &format!("{:?}", config.provider));
    if let Some(limit) = config.run_timeout() {
        output.kv("timeout", &format!("{}s", limit.as_secs()));
    }

    let orchestrator = build_orchestrator(&config).context("failed to set up the pipeline")?;
    let brief = Brief::from_config(&config);

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, cancelling run");
                cancel.cancel();
            }
        })
    };

    let result = orchestrator.run_with_cancel(&brief, cancel).await;
    interrupt.abort();

    let pipeline = result.context("newsletter run failed")?;
    report(&pipeline, output);

    let path = write_newsletter(&config.output.directory, &pipeline.document, Local::now())
        .with_context(|| format!("failed to write to {}", config.output.directory.display()))?;
    output.created("newsletter", &path.display().to_string());
    output.complete("Newsletter ready!");
    Ok(path)
}

fn report(pipeline: &PipelineOutput, output: &Output) {
    output.header("Stages");
    let total = pipeline.stages.len();
    for (i, record) in pipeline.stages.iter().enumerate() {
        output.stage(i + 1, total, &record.stage.to_string(), &record.detail, record.duration_ms);
    }

    output.header("Stories");
    for finding in &pipeline.ranked {
        output.list_item(&finding.headline);
    }
    if pipeline.ranked.is_empty() {
        output.warning("No stories survived refinement");
    }
}
