/// TOML configuration: loading, defaults and validation.
pub mod toml_config;

pub use toml_config::{ConfigError, ThinkleConfig};
