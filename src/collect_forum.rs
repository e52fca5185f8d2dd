//! Forum corpus collector.
//!
//! Queries a Discourse instance's search API, fetches the first few matching
//! threads, and writes their posts as plain text to the forum context file.
//! Requests are anonymous; forums that require a login will return only
//! public topics.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::collect_course::CollectStats;
use crate::config::{Config, ForumCollectorConfig};

/// Wrap width for rendered post bodies.
const TEXT_WIDTH: usize = 400;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    topics: Vec<serde_json::Value>,
}

/// A topic entry from `search.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct Topic {
    pub id: u64,
    pub slug: String,
    pub title: String,
}

#[derive(Debug, Deserialize)]
struct ThreadResponse {
    post_stream: PostStream,
}

#[derive(Debug, Deserialize)]
struct PostStream {
    posts: Vec<Post>,
}

/// A single post from `t/{slug}/{id}.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct Post {
    pub username: String,
    /// Server-rendered HTML body.
    pub cooked: String,
}

/// A fetched thread, ready to render.
#[derive(Debug, Clone)]
pub struct ForumThread {
    pub title: String,
    pub posts: Vec<Post>,
}

/// Thin client over the Discourse JSON endpoints.
pub struct ForumClient {
    client: reqwest::Client,
    base_url: String,
}

impl ForumClient {
    pub fn new(config: &ForumCollectorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Runs a search and returns the topics that parse.
    pub async fn search(&self, query: &str) -> Result<Vec<Topic>> {
        let url = format!("{}/search.json", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("q", query)])
            .send()
            .await
            .with_context(|| format!("Forum search request failed: {}", url))?
            .error_for_status()
            .context("Forum search returned an error status")?;

        let body: SearchResponse = response
            .json()
            .await
            .context("Invalid forum search response")?;

        let mut topics = Vec::with_capacity(body.topics.len());
        for raw in body.topics {
            match serde_json::from_value::<Topic>(raw) {
                Ok(topic) => topics.push(topic),
                Err(e) => tracing::warn!(error = %e, "skipping malformed search topic"),
            }
        }
        Ok(topics)
    }

    /// Fetches all posts of one topic.
    pub async fn fetch_thread(&self, topic: &Topic) -> Result<ForumThread> {
        let url = format!("{}/t/{}/{}.json", self.base_url, topic.slug, topic.id);
        let response = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?;
        let thread: ThreadResponse = response.json().await?;

        Ok(ForumThread {
            title: topic.title.clone(),
            posts: thread.post_stream.posts,
        })
    }
}

/// Searches the forum, fetches up to `max_topics` threads, and writes
/// `context.forum_path`. A thread that fails to load is skipped.
pub async fn run_collect_forum(config: &Config) -> Result<CollectStats> {
    let forum = &config.collectors.forum;
    let client = ForumClient::new(forum)?;

    let query = forum.search_query();
    let topics = client.search(&query).await?;
    tracing::info!(found = topics.len(), query = %query, "forum search complete");

    let mut threads = Vec::new();
    for topic in topics.iter().take(forum.max_topics) {
        match client.fetch_thread(topic).await {
            Ok(thread) => threads.push(thread),
            Err(e) => {
                let chain = format!("{:#}", e);
                tracing::warn!(topic_id = topic.id, error = %chain, "skipping topic");
            }
        }
    }

    let corpus = render_threads(&threads);
    let out = &config.context.forum_path;
    std::fs::write(out, &corpus)
        .with_context(|| format!("Failed to write forum context: {}", out.display()))?;

    let stats = CollectStats {
        items: threads.len(),
        bytes: corpus.len(),
    };
    tracing::info!(threads = stats.items, bytes = stats.bytes, path = %out.display(), "forum context written");
    Ok(stats)
}

/// Renders one post as `<username>: <plain text body>`.
pub fn render_post(post: &Post) -> String {
    let body = html2text::from_read(post.cooked.as_bytes(), TEXT_WIDTH)
        .unwrap_or_else(|_| post.cooked.clone());
    format!("{}: {}", post.username, body.trim())
}

/// Joins threads with blank lines; each thread is a `--- <title> ---` header
/// followed by one line per post.
pub fn render_threads(threads: &[ForumThread]) -> String {
    threads
        .iter()
        .map(|thread| {
            let mut lines = vec![format!("\n--- {} ---\n", thread.title)];
            lines.extend(thread.posts.iter().map(render_post));
            lines.join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn post(user: &str, cooked: &str) -> Post {
        Post {
            username: user.to_string(),
            cooked: cooked.to_string(),
        }
    }

    #[test]
    fn test_render_post_strips_html() {
        let line = render_post(&post("alice", "<p>Use <strong>uv</strong> here.</p>\n"));
        assert!(line.starts_with("alice: "));
        assert!(line.contains("uv"));
        assert!(!line.contains("<p>"));
        assert!(!line.contains("<strong>"));
    }

    #[test]
    fn test_render_threads_layout() {
        let threads = vec![
            ForumThread {
                title: "GA1 doubt".to_string(),
                posts: vec![post("a", "<p>q</p>"), post("b", "<p>ans</p>")],
            },
            ForumThread {
                title: "Project 2".to_string(),
                posts: vec![post("c", "<p>hi</p>")],
            },
        ];
        assert_eq!(
            render_threads(&threads),
            "\n--- GA1 doubt ---\n\na: q\nb: ans\n\n\n--- Project 2 ---\n\nc: hi"
        );
    }

    #[test]
    fn test_render_no_threads() {
        assert_eq!(render_threads(&[]), "");
    }

    fn config_for(server: &MockServer, tmp: &TempDir) -> Config {
        let mut cfg = Config::default();
        cfg.collectors.forum = ForumCollectorConfig {
            base_url: format!("{}/", server.uri()),
            query: "#courses:tds-kb".to_string(),
            after: Some("2024-12-31".to_string()),
            before: None,
            max_topics: 2,
            timeout_secs: 5,
        };
        cfg.context.forum_path = tmp.path().join("forum_context.txt");
        cfg
    }

    #[tokio::test]
    async fn test_collect_forum_end_to_end() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.json"))
            .and(query_param("q", "#courses:tds-kb after:2024-12-31"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "topics": [
                    { "id": 1, "slug": "first", "title": "First topic" },
                    { "id": 2, "slug": "broken", "title": "Broken topic" },
                    { "id": 3, "slug": "third", "title": "Over the limit" },
                    { "slug": "no-id" }
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/t/first/1.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "post_stream": { "posts": [
                    { "username": "alice", "cooked": "<p>When is the deadline?</p>" },
                    { "username": "bob", "cooked": "<p>Sunday.</p>" }
                ]}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/t/broken/2.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/t/third/3.json"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let tmp = TempDir::new().unwrap();
        let cfg = config_for(&server, &tmp);
        let stats = run_collect_forum(&cfg).await.unwrap();
        assert_eq!(stats.items, 1);

        let written = std::fs::read_to_string(&cfg.context.forum_path).unwrap();
        assert!(written.contains("--- First topic ---"));
        assert!(written.contains("alice: When is the deadline?"));
        assert!(written.contains("bob: Sunday."));
        assert!(!written.contains("Broken topic"));
    }

    #[tokio::test]
    async fn test_search_failure_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.json"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let tmp = TempDir::new().unwrap();
        let cfg = config_for(&server, &tmp);
        assert!(run_collect_forum(&cfg).await.is_err());
        assert!(!cfg.context.forum_path.exists());
    }
}
