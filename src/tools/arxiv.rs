//! Academic paper lookup via the arXiv export API
//!
//! The Atom feed is returned to the worker untouched apart from truncation;
//! the decision-maker reads it as text.

use crate::tools::registry::Capability;
use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

const ARXIV_URL: &str = "http://export.arxiv.org";
const MAX_FEED_CHARS: usize = 20_000;

pub struct ArxivSearchTool {
    client: reqwest::Client,
    base_url: String,
}

impl ArxivSearchTool {
    pub fn new() -> Self {
        Self::with_base_url(ARXIV_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

impl Default for ArxivSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Capability for ArxivSearchTool {
    fn name(&self) -> &str {
        "arxiv_search"
    }

    fn description(&self) -> &str {
        "Search arXiv for recent academic papers, newest first"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search terms"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of papers (default: 5)",
                    "default": 5
                }
            },
            "required": ["query"]
        })
    }

    async fn invoke(&self, args: Value) -> Result<String> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AppError::InvalidInput("Missing 'query' parameter".to_string()))?;
        let max_results = args.get("max_results").and_then(|v| v.as_u64()).unwrap_or(5);

        let url = format!("{}/api/query", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("search_query", format!("all:{}", query)),
                ("max_results", max_results.to_string()),
                ("sortBy", "submittedDate".to_string()),
                ("sortOrder", "descending".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Capability(format!(
                "arXiv query failed ({})",
                response.status()
            )));
        }

        let feed = response.text().await?;
        Ok(truncate_chars(feed, MAX_FEED_CHARS))
    }
}

fn truncate_chars(mut text: String, max: usize) -> String {
    if let Some((idx, _)) = text.char_indices().nth(max) {
        text.truncate(idx);
    }
    text
}
