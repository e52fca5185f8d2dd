//! # Virtual TA
//!
//! A question-answering relay for a course. A student question is combined
//! with course notes and forum threads, sent to a hosted chat model, and the
//! model's reply is normalized into a fixed `{answer, links}` shape.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐      ┌──────────────┐
//! │ collect      │      │ collect      │
//! │ course (.md) │      │ forum (API)  │
//! └──────┬───────┘      └──────┬───────┘
//!        ▼                     ▼
//!  course_context.txt    forum_context.txt
//!        └──────────┬──────────┘
//!                   ▼
//!  POST /api/ ─▶ context ─▶ prompt ─▶ completion ─▶ normalize ─▶ {answer, links}
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! vta collect course            # render ./course-content/**/*.md
//! vta collect forum             # fetch forum threads
//! export AIPROXY_TOKEN=...
//! vta serve                     # start HTTP server
//! vta ask "When is GA1 due?"    # one-shot from the CLI
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Request/response types |
//! | [`context`] | Corpus loading and truncation |
//! | [`prompt`] | Prompt template |
//! | [`completion`] | Chat-completion provider |
//! | [`normalize`] | Completion → structured answer |
//! | [`image`] | Image attachment validation |
//! | [`relay`] | End-to-end question pipeline |
//! | [`server`] | HTTP server |
//! | [`collect_course`] | Markdown tree → course corpus |
//! | [`collect_forum`] | Forum search → forum corpus |

pub mod collect_course;
pub mod collect_forum;
pub mod completion;
pub mod config;
pub mod context;
pub mod image;
pub mod models;
pub mod normalize;
pub mod prompt;
pub mod relay;
pub mod server;
