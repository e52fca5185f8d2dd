//! Corpus loading and blind truncation.
//!
//! Both corpora are read fresh for every question so that a collector run
//! takes effect without restarting the server. No relevance selection is
//! done: each corpus contributes its first N characters.

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::ContextConfig;

/// The truncated course and forum text for one prompt.
#[derive(Debug, Clone)]
pub struct ContextBundle {
    pub course: String,
    pub forum: String,
}

pub async fn load_context(config: &ContextConfig) -> Result<ContextBundle> {
    let course = read_corpus(&config.course_path).await?;
    let forum = read_corpus(&config.forum_path).await?;

    Ok(ContextBundle {
        course: truncate_chars(&course, config.course_max_chars).to_string(),
        forum: truncate_chars(&forum, config.forum_max_chars).to_string(),
    })
}

async fn read_corpus(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read context file: {}", path.display()))
}

/// Returns the first `max_chars` Unicode scalars of `text`.
///
/// Never splits a multi-byte character.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
