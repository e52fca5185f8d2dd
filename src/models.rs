//! Request and response types for the question-answering API.

use serde::{Deserialize, Serialize};

/// A student question, optionally with a base64-encoded image.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QaRequest {
    pub question: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// A supporting link attached to an answer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Link {
    pub url: String,
    pub text: String,
}

/// The answer payload. Every response path produces exactly this shape.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct QaResponse {
    pub answer: String,
    pub links: Vec<Link>,
}

impl QaResponse {
    /// An answer with no links.
    pub fn message(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            links: Vec::new(),
        }
    }
}
