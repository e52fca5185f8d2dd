//! The question-answering pipeline.
//!
//! ```text
//! question ─▶ load_context ─▶ build_prompt ─▶ provider.complete ─▶ normalize_completion
//! ```
//!
//! [`answer_question`] is infallible: any error before normalization is
//! logged and reported to the caller as [`GENERIC_ERROR`].

use anyhow::Result;

use crate::completion::CompletionProvider;
use crate::config::Config;
use crate::context::load_context;
use crate::image::{inspect_image, ImageCheck};
use crate::models::{QaRequest, QaResponse};
use crate::normalize::normalize_completion;
use crate::prompt::build_prompt;

/// Answer returned when the context, prompt, or completion step fails.
pub const GENERIC_ERROR: &str = "There was an error generating a response.";

/// Assembles the prompt for `question` from the configured corpora.
pub async fn prepare_prompt(config: &Config, question: &str) -> Result<String> {
    let context = load_context(&config.context).await?;
    Ok(build_prompt(
        &context,
        question,
        config.context.prompt_max_chars,
    ))
}

/// Runs the full pipeline for one request.
pub async fn answer_question(
    config: &Config,
    provider: &dyn CompletionProvider,
    request: &QaRequest,
) -> QaResponse {
    if let Some(image) = request.image.as_deref().filter(|s| !s.is_empty()) {
        match inspect_image(image) {
            ImageCheck::Valid { bytes } => tracing::debug!(bytes, "image attachment decoded"),
            ImageCheck::Invalid(e) => tracing::warn!(error = %e, "image attachment is not valid base64"),
        }
    }

    match complete(config, provider, &request.question).await {
        Ok(raw) => normalize_completion(&raw),
        Err(e) => {
            let chain = format!("{:#}", e);
            tracing::error!(error = %chain, model = provider.model_name(), "completion failed");
            QaResponse::message(GENERIC_ERROR)
        }
    }
}

async fn complete(
    config: &Config,
    provider: &dyn CompletionProvider,
    question: &str,
) -> Result<String> {
    let prompt = prepare_prompt(config, question).await?;
    provider
        .complete(&config.completion.system_prompt, &prompt)
        .await
}
