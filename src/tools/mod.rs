//! Research Capabilities
//!
//! Capabilities are the named external actions a research worker may invoke
//! while it investigates a topic. Each one takes JSON arguments and returns
//! raw text, which the worker appends to its conversation history.
//!
//! # Module Structure
//!
//! - [`registry`](crate::tools::registry) - The `Capability` trait and registry
//! - [`search`](crate::tools::search) - Web search and page fetch (daedra, feature `web-search`)
//! - [`reddit`](crate::tools::reddit) - Reddit discussion search
//! - [`arxiv`](crate::tools::arxiv) - Academic paper lookup
//!
//! # Usage
//!
//! ```ignore
//! let registry = CapabilityRegistry::from_content_config(&config.content);
//! let text = registry.invoke("arxiv_search", json!({"query": "fusion"})).await?;
//! ```

/// arXiv paper search.
pub mod arxiv;
/// Reddit submission search.
pub mod reddit;
/// Capability trait and registry.
pub mod registry;
/// Web search and page fetching using DuckDuckGo.
#[cfg(feature = "web-search")]
pub mod search;

pub use registry::{Capability, CapabilityRegistry};
