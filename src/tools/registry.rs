use crate::types::{AppError, Result, ToolDefinition};
use crate::utils::toml_config::ContentConfig;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A named external action a research worker can invoke.
///
/// Capabilities are black boxes to the engine: arguments go in, raw text comes
/// out. Retrying is the capability's own business.
#[async_trait]
pub trait Capability: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;
    async fn invoke(&self, args: Value) -> Result<String>;
}

#[derive(Clone)]
pub struct CapabilityRegistry {
    capabilities: HashMap<String, Arc<dyn Capability>>,
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            capabilities: HashMap::new(),
        }
    }

    /// Create a registry with the connectors enabled by the content settings
    pub fn from_content_config(content: &ContentConfig) -> Self {
        let mut registry = Self::new();

        if content.include_news {
            #[cfg(feature = "web-search")]
            {
                registry.register(Arc::new(crate::tools::search::SearchTool::new()));
                registry.register(Arc::new(crate::tools::search::FetchPageTool::new()));
            }
            #[cfg(not(feature = "web-search"))]
            tracing::warn!("News sources enabled but the web-search feature is not compiled in");
        }

        if content.include_reddit {
            registry.register(Arc::new(crate::tools::reddit::RedditSearchTool::new(
                content.reddit.clone(),
            )));
        }

        if content.include_academic {
            registry.register(Arc::new(crate::tools::arxiv::ArxivSearchTool::new()));
        }

        registry
    }

    pub fn register(&mut self, capability: Arc<dyn Capability>) {
        self.capabilities
            .insert(capability.name().to_string(), capability);
    }

    /// Definitions of all registered capabilities, sorted by name
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> = self
            .capabilities
            .values()
            .map(|capability| ToolDefinition {
                name: capability.name().to_string(),
                description: capability.description().to_string(),
                parameters: capability.parameters_schema(),
            })
            .collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    pub async fn invoke(&self, name: &str, args: Value) -> Result<String> {
        if let Some(capability) = self.capabilities.get(name) {
            capability.invoke(args).await
        } else {
            Err(AppError::NotFound(format!("Capability not found: {}", name)))
        }
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.capabilities.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn has(&self, name: &str) -> bool {
        self.capabilities.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}
