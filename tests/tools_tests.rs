//! Connector tests against mocked Reddit and arXiv endpoints.

use chrono::{Duration, Utc};
use serde_json::{json, Value};
use thinkle::tools::arxiv::ArxivSearchTool;
use thinkle::tools::reddit::RedditSearchTool;
use thinkle::tools::Capability;
use thinkle::types::AppError;
use thinkle::utils::toml_config::RedditSettings;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn hours_ago(hours: i64) -> i64 {
    (Utc::now() - Duration::hours(hours)).timestamp()
}

fn reddit_tool(server: &MockServer) -> RedditSearchTool {
    RedditSearchTool::with_base_url(
        RedditSettings {
            min_upvotes: 100,
            max_age_hours: 48,
        },
        server.uri(),
    )
}

// ============= Reddit =============

#[tokio::test]
async fn test_reddit_sends_query_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reddit/search/submission"))
        .and(query_param("q", "rust async"))
        .and(query_param("subreddit", "rust"))
        .and(query_param("size", "3"))
        .and(query_param("sort_type", "score"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let text = reddit_tool(&server)
        .invoke(json!({ "query": "rust async", "subreddit": "rust", "limit": 3 }))
        .await
        .unwrap();

    let posts: Vec<Value> = serde_json::from_str(&text).unwrap();
    assert!(posts.is_empty());
}

#[tokio::test]
async fn test_reddit_filters_low_score_and_stale_posts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reddit/search/submission"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {
                    "title": "Tokio 2.0 announced",
                    "permalink": "/r/rust/comments/abc/tokio_20/",
                    "score": 950,
                    "subreddit": "rust",
                    "created_utc": hours_ago(3)
                },
                {
                    "title": "Barely noticed",
                    "permalink": "/r/rust/comments/def/",
                    "score": 12,
                    "subreddit": "rust",
                    "created_utc": hours_ago(3)
                },
                {
                    "title": "Last month's news",
                    "permalink": "/r/rust/comments/ghi/",
                    "score": 4000,
                    "subreddit": "rust",
                    "created_utc": hours_ago(24 * 30)
                },
                {
                    "permalink": "/r/rust/comments/jkl/",
                    "score": 300,
                    "subreddit": "rust"
                }
            ]
        })))
        .mount(&server)
        .await;

    let text = reddit_tool(&server)
        .invoke(json!({ "query": "tokio" }))
        .await
        .unwrap();
    let posts: Vec<Value> = serde_json::from_str(&text).unwrap();

    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0]["title"], "Tokio 2.0 announced");
    assert_eq!(
        posts[0]["url"],
        "https://www.reddit.com/r/rust/comments/abc/tokio_20/"
    );
    assert_eq!(posts[0]["score"], 950);
    assert_eq!(posts[1]["title"], "No title");
}

#[tokio::test]
async fn test_reddit_error_status_is_a_capability_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reddit/search/submission"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = reddit_tool(&server)
        .invoke(json!({ "query": "tokio" }))
        .await
        .unwrap_err();

    match err {
        AppError::Capability(message) => assert!(message.contains("503"), "{message}"),
        other => panic!("expected a capability error, got {other:?}"),
    }
}

// ============= arXiv =============

#[tokio::test]
async fn test_arxiv_sends_query_parameters() {
    let server = MockServer::start().await;
    let feed = "<feed><entry><title>Fusion at scale</title></entry></feed>";
    Mock::given(method("GET"))
        .and(path("/api/query"))
        .and(query_param("search_query", "all:fusion"))
        .and(query_param("max_results", "2"))
        .and(query_param("sortBy", "submittedDate"))
        .and(query_param("sortOrder", "descending"))
        .respond_with(ResponseTemplate::new(200).set_body_string(feed))
        .expect(1)
        .mount(&server)
        .await;

    let text = ArxivSearchTool::with_base_url(server.uri())
        .invoke(json!({ "query": "fusion", "max_results": 2 }))
        .await
        .unwrap();

    assert_eq!(text, feed);
}

#[tokio::test]
async fn test_arxiv_long_feed_is_truncated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/query"))
        .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(50_000)))
        .mount(&server)
        .await;

    let text = ArxivSearchTool::with_base_url(server.uri())
        .invoke(json!({ "query": "fusion" }))
        .await
        .unwrap();

    assert_eq!(text.len(), 20_000);
}

#[tokio::test]
async fn test_arxiv_error_status_is_a_capability_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/query"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = ArxivSearchTool::with_base_url(server.uri())
        .invoke(json!({ "query": "fusion" }))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Capability(_)), "{err:?}");
}
