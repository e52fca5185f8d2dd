//! Prompt template.

use crate::context::{truncate_chars, ContextBundle};

/// Assembles the user prompt and truncates it to `max_chars`.
///
/// The model is told to reply with a bare JSON object holding `answer` and
/// `links`; [`crate::normalize`] copes with replies that ignore this.
pub fn build_prompt(context: &ContextBundle, question: &str, max_chars: usize) -> String {
    let prompt = format!(
        r#"
You are a helpful Teaching Assistant for the course.

You must ONLY respond in valid JSON with two fields: "answer" and "links".
DO NOT include explanations, formatting, headers, or markdown.

Here is the course context:
{course}

Here are relevant forum discussions:
{forum}

Student's question:
{question}

Respond with ONLY the following JSON structure:

{{
  "answer": "Directly answer the student's question here using only course/forum information.",
  "links": [
    {{
      "url": "https://example.com/relevant-resource",
      "text": "Brief description of the resource"
    }}
  ]
}}
"#,
        course = context.course,
        forum = context.forum,
        question = question,
    );

    truncate_chars(&prompt, max_chars).to_string()
}
