//! CLI module for Thinkle
//!
//! Provides command-line interface parsing and handling for the thinkle binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod init;
pub mod output;
pub mod run;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Thinkle - a personal research newsletter, written by a team of agents
///
/// Plans research tasks from your interests, runs scouts in parallel,
/// refines what they find and composes a newsletter.
#[derive(Parser, Debug)]
#[command(
    name = "thinkle",
    author = "TheThinkle <build@thethinkle.ai>",
    version,
    about = "Thinkle - a personal research newsletter written by a team of agents",
    long_about = "Plans research tasks from your interests, runs scout agents in parallel,\n\
                  refines what they find with bounded follow-up research, and composes a newsletter.",
    after_help = "EXAMPLES:\n    \
                  thinkle init                     # Write an example thinkle.toml\n    \
                  thinkle config --validate        # Check the configuration\n    \
                  thinkle run                      # Generate a newsletter\n    \
                  thinkle run --timeout 600        # Give up after ten minutes\n    \
                  thinkle --config my.toml run     # Use a custom config file"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "thinkle.toml", global = true, env = "THINKLE_CONFIG")]
    pub config: PathBuf,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the pipeline and write a newsletter
    Run {
        /// Directory for the newsletter (overrides output.directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Abort the run after this many seconds (overrides pipeline.run_timeout_secs)
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// Write an example configuration file
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing thinkle.toml
        #[arg(short, long)]
        force: bool,
    },

    /// Show configuration information
    Config {
        /// Validate the configuration file
        #[arg(long)]
        validate: bool,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
