//! Course corpus collector.
//!
//! Walks a Markdown documentation tree, renders every matching file to plain
//! text, and writes the concatenation to the course context file.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::PathBuf;
use walkdir::WalkDir;

use crate::config::Config;

/// Wrap width handed to the HTML renderer; wide enough that prose is not
/// re-wrapped in practice.
const TEXT_WIDTH: usize = 400;

/// One Markdown file rendered to text.
#[derive(Debug, Clone)]
pub struct CourseDocument {
    pub path: PathBuf,
    pub text: String,
}

/// Summary of a collector run.
#[derive(Debug, Clone)]
pub struct CollectStats {
    pub items: usize,
    pub bytes: usize,
}

/// Scans the configured course tree and writes `context.course_path`.
pub fn run_collect_course(config: &Config) -> Result<CollectStats> {
    let docs = scan_course(config)?;
    let corpus = render_corpus(&docs);

    let out = &config.context.course_path;
    std::fs::write(out, &corpus)
        .with_context(|| format!("Failed to write course context: {}", out.display()))?;

    let stats = CollectStats {
        items: docs.len(),
        bytes: corpus.len(),
    };
    tracing::info!(files = stats.items, bytes = stats.bytes, path = %out.display(), "course context written");
    Ok(stats)
}

/// Finds and renders all matching Markdown files, sorted by relative path.
pub fn scan_course(config: &Config) -> Result<Vec<CourseDocument>> {
    let course = &config.collectors.course;
    let root = &course.root;
    if !root.exists() {
        bail!("Course content root does not exist: {}", root.display());
    }

    let include_set = build_globset(&course.include_globs)?;

    let mut default_excludes = vec!["**/.git/**".to_string(), "**/node_modules/**".to_string()];
    default_excludes.extend(course.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut matched = Vec::new();

    let walker = WalkDir::new(root).follow_links(course.follow_symlinks);
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        matched.push((rel_str, path.to_path_buf()));
    }

    matched.sort_by(|a, b| a.0.cmp(&b.0));

    let mut docs = Vec::with_capacity(matched.len());
    for (_, path) in matched {
        let markdown = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let text = markdown_to_text(&markdown)
            .with_context(|| format!("Failed to render {}", path.display()))?;
        docs.push(CourseDocument { path, text });
    }

    Ok(docs)
}

/// Renders Markdown to HTML, then HTML to plain text.
pub fn markdown_to_text(markdown: &str) -> Result<String> {
    let parser = pulldown_cmark::Parser::new(markdown);
    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, parser);

    let text = html2text::from_read(html.as_bytes(), TEXT_WIDTH)?;
    Ok(text)
}

/// Joins documents as `\n--- <path> ---\n` headers, each followed by its text.
pub fn render_corpus(docs: &[CourseDocument]) -> String {
    let mut parts = Vec::with_capacity(docs.len() * 2);
    for doc in docs {
        parts.push(format!("\n--- {} ---\n", doc.path.display()));
        parts.push(doc.text.clone());
    }
    parts.join("\n")
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
