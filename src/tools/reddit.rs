//! Reddit discussion search via the Pushshift API

use crate::tools::registry::Capability;
use crate::types::{AppError, Result};
use crate::utils::toml_config::RedditSettings;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const PUSHSHIFT_URL: &str = "https://api.pushshift.io";

#[derive(Debug, Deserialize)]
struct SubmissionPage {
    #[serde(default)]
    data: Vec<Submission>,
}

#[derive(Debug, Deserialize)]
struct Submission {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    permalink: Option<String>,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    subreddit: Option<String>,
    #[serde(default)]
    created_utc: Option<i64>,
}

#[derive(Debug, Serialize)]
struct Post {
    title: String,
    url: String,
    score: i64,
    subreddit: String,
    created_utc: Option<i64>,
}

pub struct RedditSearchTool {
    client: reqwest::Client,
    base_url: String,
    settings: RedditSettings,
}

impl RedditSearchTool {
    pub fn new(settings: RedditSettings) -> Self {
        Self::with_base_url(settings, PUSHSHIFT_URL)
    }

    pub fn with_base_url(settings: RedditSettings, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            settings,
        }
    }

    /// Drops posts below the upvote floor or older than the age window.
    fn keep(&self, submission: &Submission) -> bool {
        if submission.score < self.settings.min_upvotes as i64 {
            return false;
        }
        let oldest = Utc::now() - Duration::hours(self.settings.max_age_hours as i64);
        match submission.created_utc {
            Some(created) => created >= oldest.timestamp(),
            None => true,
        }
    }
}

#[async_trait]
impl Capability for RedditSearchTool {
    fn name(&self) -> &str {
        "reddit_search"
    }

    fn description(&self) -> &str {
        "Search Reddit submissions for community discussion of a topic"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search term"
                },
                "subreddit": {
                    "type": "string",
                    "description": "Subreddit to search (default: all)",
                    "default": "all"
                },
                "limit": {
                    "type": "integer",
                    "description": "Number of posts to return (default: 5)",
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
        let subreddit = args
            .get("subreddit")
            .and_then(|v| v.as_str())
            .unwrap_or("all");
        let limit = args.get("limit").and_then(|v| v.as_u64()).unwrap_or(5);

        let size = limit.to_string();

        let url = format!("{}/reddit/search/submission", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", query),
                ("subreddit", subreddit),
                ("size", size.as_str()),
                ("sort", "desc"),
                ("sort_type", "score"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Capability(format!(
                "Reddit search failed ({})",
                response.status()
            )));
        }

        let page: SubmissionPage = response.json().await?;
        let posts: Vec<Post> = page
            .data
            .into_iter()
            .filter(|s| self.keep(s))
            .map(|s| Post {
                title: s.title.unwrap_or_else(|| "No title".to_string()),
                url: format!(
                    "https://www.reddit.com{}",
                    s.permalink.unwrap_or_default()
                ),
                score: s.score,
                subreddit: s.subreddit.unwrap_or_default(),
                created_utc: s.created_utc,
            })
            .collect();

        serde_json::to_string_pretty(&posts)
            .map_err(|e| AppError::Internal(format!("Failed to render posts: {}", e)))
    }
}
