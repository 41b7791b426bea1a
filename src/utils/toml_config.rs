//! TOML-based configuration for Thinkle
//!
//! A single `thinkle.toml` describes the reader (interests and profile), the
//! newsletter style, which content sources the research workers may use, the
//! model provider, and the pipeline bounds.
//!
//! ```toml
//! interests = ["artificial intelligence", "climate change"]
//! user_profile = "Backend engineer who follows ML infrastructure"
//! max_tasks = 3
//!
//! [newsletter]
//! tone = "witty"
//! max_stories = 10
//!
//! [provider]
//! type = "ollama"
//! base_url = "http://localhost:11434"
//!
//! [pipeline]
//! max_tool_iterations = 3
//! max_refinement_cycles = 1
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Errors raised while loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("configuration validation failed: {0}")]
    Validation(String),
}

/// Root configuration structure loaded from thinkle.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThinkleConfig {
    /// Topics the reader follows
    pub interests: Vec<String>,

    /// Short background on the reader, used to tailor research and ranking
    #[serde(default)]
    pub user_profile: String,

    /// Maximum number of research tasks the planner may create
    #[serde(default = "default_max_tasks")]
    pub max_tasks: usize,

    #[serde(default)]
    pub newsletter: NewsletterConfig,

    #[serde(default)]
    pub content: ContentConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub models: ModelsConfig,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub pipeline: PipelineSettings,
}

fn default_max_tasks() -> usize {
    1
}

// ============= Newsletter Configuration =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Professional,
    #[default]
    Witty,
    Casual,
    Academic,
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tone::Professional => write!(f, "professional"),
            Tone::Witty => write!(f, "witty"),
            Tone::Casual => write!(f, "casual"),
            Tone::Academic => write!(f, "academic"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    #[default]
    Weekly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewsletterConfig {
    #[serde(default)]
    pub tone: Tone,

    #[serde(default = "default_true")]
    pub include_opinions: bool,

    #[serde(default)]
    pub frequency: Frequency,

    /// Maximum stories handed to the composer
    #[serde(default = "default_max_stories")]
    pub max_stories: usize,
}

fn default_true() -> bool {
    true
}

fn default_max_stories() -> usize {
    10
}

impl Default for NewsletterConfig {
    fn default() -> Self {
        Self {
            tone: Tone::default(),
            include_opinions: true,
            frequency: Frequency::default(),
            max_stories: default_max_stories(),
        }
    }
}

// ============= Content Sources =============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContentConfig {
    /// arXiv papers
    #[serde(default = "default_true")]
    pub include_academic: bool,

    /// Reddit discussions
    #[serde(default = "default_true")]
    pub include_reddit: bool,

    /// Web news search
    #[serde(default = "default_true")]
    pub include_news: bool,

    #[serde(default)]
    pub reddit: RedditSettings,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            include_academic: true,
            include_reddit: true,
            include_news: true,
            reddit: RedditSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedditSettings {
    #[serde(default = "default_min_upvotes")]
    pub min_upvotes: u32,

    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: u32,
}

fn default_min_upvotes() -> u32 {
    100
}

fn default_max_age_hours() -> u32 {
    48
}

impl Default for RedditSettings {
    fn default() -> Self {
        Self {
            min_upvotes: default_min_upvotes(),
            max_age_hours: default_max_age_hours(),
        }
    }
}

// ============= Output Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Directory the finished newsletter is written to
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,

    /// Ask the composer to link sources
    #[serde(default = "default_true")]
    pub include_sources: bool,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data/outputs")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            include_sources: true,
        }
    }
}

// ============= Model Configuration =============

/// Model name per collaborator role
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelsConfig {
    #[serde(default = "default_model")]
    pub planner: String,
    #[serde(default = "default_model")]
    pub scout: String,
    #[serde(default = "default_model")]
    pub evaluator: String,
    #[serde(default = "default_model")]
    pub writer: String,
}

fn default_model() -> String {
    "ministral-3:3b".to_string()
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            planner: default_model(),
            scout: default_model(),
            evaluator: default_model(),
            writer: default_model(),
        }
    }
}

// ============= Provider Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
        #[serde(default = "default_request_timeout")]
        timeout_secs: u64,
    },
    OpenAI {
        /// Environment variable containing API key
        #[serde(default = "default_openai_key_env")]
        api_key_env: String,
        #[serde(default = "default_openai_base")]
        api_base: String,
        #[serde(default = "default_request_timeout")]
        timeout_secs: u64,
    },
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_request_timeout() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::Ollama {
            base_url: default_ollama_url(),
            timeout_secs: default_request_timeout(),
        }
    }
}

impl ProviderConfig {
    pub fn request_timeout(&self) -> Duration {
        match self {
            ProviderConfig::Ollama { timeout_secs, .. }
            | ProviderConfig::OpenAI { timeout_secs, .. } => Duration::from_secs(*timeout_secs),
        }
    }
}

// ============= Pipeline Configuration =============

/// Bounds and policies of the research pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineSettings {
    /// Capability rounds a single worker may perform
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,

    /// Follow-up research cycles the refinement stage may start
    #[serde(default = "default_max_refinement_cycles")]
    pub max_refinement_cycles: u32,

    #[serde(default = "default_capability_timeout")]
    pub capability_timeout_secs: u64,

    #[serde(default)]
    pub parallel_capabilities: bool,

    #[serde(default)]
    pub stop_on_capability_error: bool,

    /// Deadline for a whole run; no deadline when unset
    #[serde(default)]
    pub run_timeout_secs: Option<u64>,
}

fn default_max_tool_iterations() -> usize {
    3
}

fn default_max_refinement_cycles() -> u32 {
    1
}

fn default_capability_timeout() -> u64 {
    30
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_tool_iterations: default_max_tool_iterations(),
            max_refinement_cycles: default_max_refinement_cycles(),
            capability_timeout_secs: default_capability_timeout(),
            parallel_capabilities: false,
            stop_on_capability_error: false,
            run_timeout_secs: None,
        }
    }
}

// ============= Loading & Validation =============

impl ThinkleConfig {
    /// Load, parse and validate a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), interests = config.interests.len(), "Loaded configuration");
        Ok(config)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Err(ConfigError::Validation(
                "configuration file is empty".to_string(),
            ));
        }
        let mut config: ThinkleConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration, normalizing the interests list in place.
    ///
    /// Interests are trimmed and deduplicated case-insensitively, keeping the
    /// first spelling and the original order.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        let mut interests = Vec::with_capacity(self.interests.len());
        for interest in &self.interests {
            let trimmed = interest.trim();
            if trimmed.is_empty() {
                continue;
            }
            if seen.insert(trimmed.to_lowercase()) {
                interests.push(trimmed.to_string());
            }
        }
        if interests.is_empty() {
            return Err(ConfigError::Validation(
                "at least one interest must be specified".to_string(),
            ));
        }
        self.interests = interests;

        if !(1..=10).contains(&self.max_tasks) {
            return Err(ConfigError::Validation(format!(
                "max_tasks must be between 1 and 10, got {}",
                self.max_tasks
            )));
        }

        if !(1..=50).contains(&self.newsletter.max_stories) {
            return Err(ConfigError::Validation(format!(
                "newsletter.max_stories must be between 1 and 50, got {}",
                self.newsletter.max_stories
            )));
        }

        let content = &self.content;
        if !(content.include_academic || content.include_reddit || content.include_news) {
            return Err(ConfigError::Validation(
                "at least one content source must be enabled".to_string(),
            ));
        }

        if content.reddit.max_age_hours == 0 {
            return Err(ConfigError::Validation(
                "content.reddit.max_age_hours must be greater than 0".to_string(),
            ));
        }

        if self.pipeline.max_tool_iterations == 0 {
            return Err(ConfigError::Validation(
                "pipeline.max_tool_iterations must be greater than 0".to_string(),
            ));
        }

        if self.pipeline.run_timeout_secs == Some(0) {
            return Err(ConfigError::Validation(
                "pipeline.run_timeout_secs must be greater than 0 when set".to_string(),
            ));
        }

        Ok(())
    }

    /// Example configuration written by `thinkle init`
    pub fn example() -> Self {
        Self {
            interests: vec![
                "artificial intelligence".to_string(),
                "machine learning".to_string(),
                "technology trends".to_string(),
                "climate change".to_string(),
            ],
            user_profile: String::new(),
            max_tasks: 3,
            newsletter: NewsletterConfig::default(),
            content: ContentConfig::default(),
            output: OutputConfig::default(),
            models: ModelsConfig::default(),
            provider: ProviderConfig::default(),
            pipeline: PipelineSettings::default(),
        }
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write this configuration to `path`
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.pipeline.run_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = ThinkleConfig::from_toml_str(r#"interests = ["ai"]"#).unwrap();
        assert_eq!(config.interests, vec!["ai"]);
        assert_eq!(config.max_tasks, 1);
        assert_eq!(config.newsletter.tone, Tone::Witty);
        assert_eq!(config.newsletter.max_stories, 10);
        assert_eq!(config.pipeline.max_tool_iterations, 3);
        assert_eq!(config.pipeline.max_refinement_cycles, 1);
        assert!(config.run_timeout().is_none());
        assert!(matches!(config.provider, ProviderConfig::Ollama { .. }));
    }

    #[test]
    fn test_interests_are_deduplicated_case_insensitively() {
        let config = ThinkleConfig::from_toml_str(
            r#"interests = ["AI", " ai ", "Space", "space", "Biotech"]"#,
        )
        .unwrap();
        assert_eq!(config.interests, vec!["AI", "Space", "Biotech"]);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = ThinkleConfig::from_toml_str("interests = [\"ai\"]\nsurprise = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_openai_provider() {
        let config = ThinkleConfig::from_toml_str(
            r#"
interests = ["ai"]

[provider]
type = "openai"
api_base = "http://localhost:8080/v1"
timeout_secs = 5
"#,
        )
        .unwrap();
        match &config.provider {
            ProviderConfig::OpenAI {
                api_key_env,
                api_base,
                ..
            } => {
                assert_eq!(api_key_env, "OPENAI_API_KEY");
                assert_eq!(api_base, "http://localhost:8080/v1");
            }
            other => panic!("unexpected provider: {:?}", other),
        }
        assert_eq!(config.provider.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_example_round_trips_through_toml() {
        let example = ThinkleConfig::example();
        let text = example.to_toml_string().unwrap();
        let parsed = ThinkleConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed.interests, example.interests);
        assert_eq!(parsed.max_tasks, 3);
    }
}
