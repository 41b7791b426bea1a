use anyhow::Context;
use thinkle::cli::init::{self, InitConfig, InitResult};
use thinkle::cli::output::Output;
use thinkle::cli::run::{self, RunOptions};
use thinkle::cli::{Cli, Commands};
use thinkle::ThinkleConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    init_tracing(cli.verbose, cli.log_json);

    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    match cli.command {
        Commands::Init { path, force } => match init::run(InitConfig { path, force }, &output) {
            InitResult::Success | InitResult::AlreadyExists => Ok(()),
            InitResult::Error(message) => anyhow::bail!(message),
        },

        Commands::Config { validate } => {
            let config = match ThinkleConfig::load(&cli.config) {
                Ok(config) => config,
                Err(e) => {
                    output.error(&e.to_string());
                    output.hint("Run `thinkle init` to create an example configuration");
                    return Err(e.into());
                }
            };
            output.header("Configuration");
            output.kv("file", &cli.config.display().to_string());
            output.kv("interests", &config.interests.join(", "));
            output.kv("max_tasks", &config.max_tasks.to_string());
            output.kv("max_stories", &config.newsletter.max_stories.to_string());
            output.kv("output", &config.output.directory.display().to_string());
            output.kv(
                "max_tool_iterations",
                &config.pipeline.max_tool_iterations.to_string(),
            );
            output.kv(
                "max_refinement_cycles",
                &config.pipeline.max_refinement_cycles.to_string(),
            );
            if validate {
                output.success("Configuration is valid");
            }
            Ok(())
        }

        Commands::Run {
            output_dir,
            timeout,
        } => {
            let config = ThinkleConfig::load(&cli.config)
                .with_context(|| format!("failed to load {}", cli.config.display()))?;
            let options = RunOptions {
                output_dir,
                timeout_secs: timeout,
            };
            if let Err(e) = run::run(config, options, &output).await {
                output.error(&format!("{:#}", e));
                return Err(e);
            }
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool, json: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("thinkle={},warn", level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(false))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init();
    }
}
