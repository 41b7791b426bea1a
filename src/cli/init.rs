//! Init command implementation
//!
//! Writes an example `thinkle.toml`, a `.env.example` and the output directory.

use super::output::Output;
use crate::utils::toml_config::ThinkleConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of the init operation
#[derive(Debug)]
pub enum InitResult {
    /// Initialization completed successfully
    Success,
    /// thinkle.toml already exists and --force was not given
    AlreadyExists,
    /// An error occurred during initialization
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: PathBuf,
    /// Overwrite existing files
    pub force: bool,
}

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.banner();
    output.header("Initializing Thinkle");

    let base_path = &config.path;
    let config_path = base_path.join("thinkle.toml");
    if config_path.exists() && !config.force {
        output.warning("thinkle.toml already exists!");
        output.hint("Use --force to overwrite it");
        return InitResult::AlreadyExists;
    }

    let example = ThinkleConfig::example();

    let output_dir = base_path.join(&example.output.directory);
    if let Err(e) = fs::create_dir_all(&output_dir) {
        output.error(&format!("Failed to create {}: {}", output_dir.display(), e));
        return InitResult::Error(e.to_string());
    }
    output.created("dir", &example.output.directory.display().to_string());

    let toml_content = match example.to_toml_string() {
        Ok(content) => content,
        Err(e) => {
            output.error(&format!("Failed to render configuration: {}", e));
            return InitResult::Error(e.to_string());
        }
    };
    if let Err(e) = write_file(&config_path, &toml_content, config.force) {
        output.error(&format!("Failed to create thinkle.toml: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.created("config", "thinkle.toml");

    let env_example_path = base_path.join(".env.example");
    if let Err(e) = write_file(&env_example_path, ENV_EXAMPLE, config.force) {
        output.warning(&format!("Failed to create .env.example: {}", e));
    } else {
        output.created("env", ".env.example");
    }

    output.complete("Thinkle initialized!");

    output.header("Next Steps");
    output.info("1. Edit your interests in thinkle.toml");
    output.info("2. Start Ollama (or set [provider] type = \"openai\"):");
    output.command("ollama serve");
    output.info("3. Generate a newsletter:");
    output.command("thinkle run");
    output.newline();

    InitResult::Success
}

fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<()> {
    if path.exists() && !force {
        return Ok(());
    }
    fs::write(path, content)
}

const ENV_EXAMPLE: &str = r#"# Thinkle Environment Variables
# Copy this file to .env and fill in the values.

# Optional: logging filter (trace, debug, info, warn, error)
RUST_LOG=thinkle=info,warn

# Required when [provider] type = "openai"
# OPENAI_API_KEY=sk-...

# Optional: alternate config location
# THINKLE_CONFIG=thinkle.toml
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn init_config(temp_dir: &TempDir, force: bool) -> InitConfig {
        InitConfig {
            path: temp_dir.path().to_path_buf(),
            force,
        }
    }

    #[test]
    fn test_run_creates_config_and_output_dir() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let result = run(init_config(&temp_dir, false), &Output::no_color());
        assert!(matches!(result, InitResult::Success));

        assert!(temp_dir.path().join("thinkle.toml").exists());
        assert!(temp_dir.path().join(".env.example").exists());
        assert!(temp_dir.path().join("data/outputs").is_dir());

        let loaded = ThinkleConfig::load(temp_dir.path().join("thinkle.toml"))
            .expect("written example should load");
        assert_eq!(loaded.interests, ThinkleConfig::example().interests);
    }

    #[test]
    fn test_run_already_exists_without_force() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(temp_dir.path().join("thinkle.toml"), "existing").expect("Failed to write");

        let result = run(init_config(&temp_dir, false), &Output::no_color());
        assert!(matches!(result, InitResult::AlreadyExists));

        let content = fs::read_to_string(temp_dir.path().join("thinkle.toml")).unwrap();
        assert_eq!(content, "existing");
    }

    #[test]
    fn test_run_force_overwrites() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(temp_dir.path().join("thinkle.toml"), "existing").expect("Failed to write");

        let result = run(init_config(&temp_dir, true), &Output::no_color());
        assert!(matches!(result, InitResult::Success));

        let content = fs::read_to_string(temp_dir.path().join("thinkle.toml")).unwrap();
        assert!(content.contains("interests"));
        assert!(!content.contains("existing"));
    }

    #[test]
    fn test_write_file_skips_existing_without_force() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("file.txt");
        fs::write(&path, "old").unwrap();

        write_file(&path, "new", false).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "old");

        write_file(&path, "new", true).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }
}
