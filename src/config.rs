//! TOML configuration parsing.
//!
//! Every section has defaults, so running without a config file gives a
//! working setup that reads `course_context.txt` / `forum_context.txt` from
//! the current directory and talks to the default completion proxy.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub collectors: CollectorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Largest accepted request body. Base64 screenshots dominate the size.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}
fn default_max_body_bytes() -> usize {
    32 * 1024 * 1024
}

/// Where the two corpora live and how much of each goes into a prompt.
#[derive(Debug, Deserialize, Clone)]
pub struct ContextConfig {
    #[serde(default = "default_course_path")]
    pub course_path: PathBuf,
    #[serde(default = "default_forum_path")]
    pub forum_path: PathBuf,
    #[serde(default = "default_course_max_chars")]
    pub course_max_chars: usize,
    #[serde(default = "default_forum_max_chars")]
    pub forum_max_chars: usize,
    #[serde(default = "default_prompt_max_chars")]
    pub prompt_max_chars: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            course_path: default_course_path(),
            forum_path: default_forum_path(),
            course_max_chars: default_course_max_chars(),
            forum_max_chars: default_forum_max_chars(),
            prompt_max_chars: default_prompt_max_chars(),
        }
    }
}

fn default_course_path() -> PathBuf {
    PathBuf::from("course_context.txt")
}
fn default_forum_path() -> PathBuf {
    PathBuf::from("forum_context.txt")
}
fn default_course_max_chars() -> usize {
    2000
}
fn default_forum_max_chars() -> usize {
    3000
}
fn default_prompt_max_chars() -> usize {
    6000
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Name of the environment variable holding the bearer token.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            api_key_env: default_api_key_env(),
            system_prompt: default_system_prompt(),
        }
    }
}

fn default_endpoint() -> String {
    "https://aiproxy.sanand.workers.dev/openai/v1/chat/completions".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_max_tokens() -> u32 {
    800
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_api_key_env() -> String {
    "AIPROXY_TOKEN".to_string()
}
fn default_system_prompt() -> String {
    "You are a helpful teaching assistant for the course.".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CollectorsConfig {
    #[serde(default)]
    pub course: CourseCollectorConfig,
    #[serde(default)]
    pub forum: ForumCollectorConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CourseCollectorConfig {
    #[serde(default = "default_course_root")]
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for CourseCollectorConfig {
    fn default() -> Self {
        Self {
            root: default_course_root(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

fn default_course_root() -> PathBuf {
    PathBuf::from("course-content")
}
fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ForumCollectorConfig {
    #[serde(default = "default_forum_base_url")]
    pub base_url: String,
    #[serde(default = "default_forum_query")]
    pub query: String,
    /// Only topics after this date (`YYYY-MM-DD`).
    #[serde(default)]
    pub after: Option<String>,
    /// Only topics before this date (`YYYY-MM-DD`).
    #[serde(default)]
    pub before: Option<String>,
    #[serde(default = "default_max_topics")]
    pub max_topics: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ForumCollectorConfig {
    fn default() -> Self {
        Self {
            base_url: default_forum_base_url(),
            query: default_forum_query(),
            after: None,
            before: None,
            max_topics: default_max_topics(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_forum_base_url() -> String {
    "https://discourse.onlinedegree.iitm.ac.in".to_string()
}
fn default_forum_query() -> String {
    "#courses:tds-kb".to_string()
}
fn default_max_topics() -> usize {
    10
}

impl ForumCollectorConfig {
    /// The full Discourse search expression, including date filters.
    pub fn search_query(&self) -> String {
        let mut q = self.query.clone();
        if let Some(after) = &self.after {
            q.push_str(&format!(" after:{}", after));
        }
        if let Some(before) = &self.before {
            q.push_str(&format!(" before:{}", before));
        }
        q
    }
}

impl CompletionConfig {
    /// Reads the bearer token from the configured environment variable.
    pub fn api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env)
            .with_context(|| format!("{} environment variable not set", self.api_key_env))
    }
}

/// Loads configuration from `path`, or defaults when no path is given.
///
/// A `.env` file in the working directory is loaded first so that
/// [`CompletionConfig::api_key`] can see tokens defined there.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    dotenvy::dotenv().ok();

    let config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            parse_config(&content)?
        }
        None => Config::default(),
    };

    validate(&config)?;
    Ok(config)
}

pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).with_context(|| "Failed to parse config file")
}

fn validate(config: &Config) -> Result<()> {
    if config.server.max_body_bytes == 0 {
        anyhow::bail!("server.max_body_bytes must be > 0");
    }

    let ctx = &config.context;
    if ctx.course_max_chars == 0 {
        anyhow::bail!("context.course_max_chars must be > 0");
    }
    if ctx.forum_max_chars == 0 {
        anyhow::bail!("context.forum_max_chars must be > 0");
    }
    if ctx.prompt_max_chars == 0 {
        anyhow::bail!("context.prompt_max_chars must be > 0");
    }

    let completion = &config.completion;
    if completion.endpoint.trim().is_empty() {
        anyhow::bail!("completion.endpoint must not be empty");
    }
    if !(0.0..=2.0).contains(&completion.temperature) {
        anyhow::bail!("completion.temperature must be in [0.0, 2.0]");
    }
    if completion.max_tokens == 0 {
        anyhow::bail!("completion.max_tokens must be > 0");
    }

    let forum = &config.collectors.forum;
    if forum.max_topics == 0 {
        anyhow::bail!("collectors.forum.max_topics must be >= 1");
    }
    for (field, value) in [("after", &forum.after), ("before", &forum.before)] {
        if let Some(date) = value {
            NaiveDate::parse_from_str(date, "%Y-%m-%d").with_context(|| {
                format!(
                    "collectors.forum.{} must be a YYYY-MM-DD date, got '{}'",
                    field, date
                )
            })?;
        }
    }

    Ok(())
}
